//! Enrollment identity - binds this install to a device and tenant.
//!
//! Written once during provisioning. The push token sub-field is the
//! exception: the platform can rotate it at any time, and the persisted
//! value is the source of truth for "does the backend need to hear the
//! new one".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentIdentity {
    /// Backend-assigned device identifier.
    pub device_id: String,
    /// Shop/tenant this device is financed through.
    pub tenant_id: String,
    /// Hardware serial, when the platform exposes it.
    pub hardware_serial: Option<String>,
    pub imei: Option<String>,
    /// Platform push-registration token. Rotated by the platform;
    /// persisted here and re-announced to the backend on change.
    pub push_token: Option<String>,
    /// Opaque credential issued at enrollment, sent on backend calls.
    pub enrollment_credential: Option<String>,
    /// True once provisioning finished; mirrored into the boot mirror.
    pub setup_complete: bool,
    pub enrolled_at: Option<DateTime<Utc>>,
}

impl EnrollmentIdentity {
    pub fn is_enrolled(&self) -> bool {
        !self.device_id.is_empty() && self.setup_complete
    }
}
