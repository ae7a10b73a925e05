//! Enterprise policy document and compliance reporting types.
//!
//! The document arrives from the backend with an arbitrary subset of
//! fields present. Enforcement applies whatever is present and skips the
//! rest; per-field failures become non-compliance entries in the report
//! instead of aborting the whole application.

use serde::{Deserialize, Serialize};

/// Loosely-typed enterprise policy. Every field is optional; absent
/// fields are simply not enforced. Re-applied wholesale on every sync,
/// which is safe because each setter is idempotent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicyDocument {
    pub camera_disabled: Option<bool>,
    pub screen_capture_disabled: Option<bool>,
    pub factory_reset_disabled: Option<bool>,
    pub safe_boot_disabled: Option<bool>,
    pub usb_file_transfer_disabled: Option<bool>,
    pub install_unknown_sources_disallowed: Option<bool>,
    pub status_bar_disabled: Option<bool>,
    pub keyguard_disabled: Option<bool>,
    /// Packages hidden from the launcher while managed.
    pub hidden_packages: Option<Vec<String>>,
    pub password_minimum_length: Option<u32>,
}

impl PolicyDocument {
    /// Number of recognized fields present in this document.
    pub fn present_fields(&self) -> usize {
        [
            self.camera_disabled.is_some(),
            self.screen_capture_disabled.is_some(),
            self.factory_reset_disabled.is_some(),
            self.safe_boot_disabled.is_some(),
            self.usb_file_transfer_disabled.is_some(),
            self.install_unknown_sources_disallowed.is_some(),
            self.status_bar_disabled.is_some(),
            self.keyguard_disabled.is_some(),
            self.hidden_packages.is_some(),
            self.password_minimum_length.is_some(),
        ]
        .iter()
        .filter(|present| **present)
        .count()
    }
}

/// Why a policy field could not be enforced on this device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NonComplianceReason {
    /// OS version too old for this setter.
    ApiLevel,
    /// Capability not held (not device owner).
    ManagementMode,
    Unknown,
}

/// One entry in the compliance report. Empty list = fully compliant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonComplianceEntry {
    pub field: String,
    pub reason: NonComplianceReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}
