//! Device administration capability and the policy enforcement adapter.
//!
//! `DeviceAdminApi` is the seam over the platform's device-owner
//! primitives. Every setter is independently idempotent and order
//! insensitive, which lets the enforcer re-apply a whole policy document
//! on every sync without diffing against a previous snapshot. The
//! capability may simply not be held (device owner revoked, unprovisioned
//! test install); callers decide what that means - the reconciler keeps
//! the logical lock state authoritative either way.

use std::sync::Arc;
use tether_common::{NonComplianceEntry, NonComplianceReason, PolicyDocument};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AdminError {
    #[error("requires platform API level {required}")]
    ApiLevel { required: u32 },
    #[error("device owner capability not held")]
    ManagementMode,
    #[error("platform rejected the call: {0}")]
    Rejected(String),
}

impl AdminError {
    pub fn reason(&self) -> NonComplianceReason {
        match self {
            AdminError::ApiLevel { .. } => NonComplianceReason::ApiLevel,
            AdminError::ManagementMode => NonComplianceReason::ManagementMode,
            AdminError::Rejected(_) => NonComplianceReason::Unknown,
        }
    }
}

/// Platform device-owner surface. The production build wires the vendor
/// bridge in here; tests substitute mocks.
pub trait DeviceAdminApi: Send + Sync {
    fn is_device_owner(&self) -> bool;

    /// Allow-list the packages that may run as a lock task.
    fn set_lock_task_packages(&self, packages: &[String]) -> Result<(), AdminError>;
    /// Pin the foreground to the given package (kiosk mode).
    fn start_lock_task(&self, package: &str) -> Result<(), AdminError>;
    fn stop_lock_task(&self) -> Result<(), AdminError>;

    fn set_status_bar_disabled(&self, disabled: bool) -> Result<(), AdminError>;
    fn set_keyguard_disabled(&self, disabled: bool) -> Result<(), AdminError>;
    /// Named platform user restriction (no_factory_reset, no_safe_boot, ...).
    fn set_user_restriction(&self, restriction: &str, active: bool) -> Result<(), AdminError>;
    fn set_camera_disabled(&self, disabled: bool) -> Result<(), AdminError>;
    fn set_screen_capture_disabled(&self, disabled: bool) -> Result<(), AdminError>;
    fn set_app_hidden(&self, package: &str, hidden: bool) -> Result<(), AdminError>;
    fn set_password_minimum_length(&self, length: u32) -> Result<(), AdminError>;
    fn set_passcode(&self, pin: &str) -> Result<(), AdminError>;
}

/// Translates lock decisions and policy documents into admin calls.
pub struct PolicyEnforcer {
    admin: Arc<dyn DeviceAdminApi>,
}

impl PolicyEnforcer {
    pub fn new(admin: Arc<dyn DeviceAdminApi>) -> Self {
        Self { admin }
    }

    pub fn is_capable(&self) -> bool {
        self.admin.is_device_owner()
    }

    /// Restrict the foreground to the lock surface and close the escape
    /// hatches. Partial failure is logged and tolerated: the next trigger
    /// re-runs the whole sequence, and each call is idempotent.
    pub fn enter_restricted_mode(&self, allowed_package: &str) {
        let allowed = vec![allowed_package.to_string()];
        log_soft(
            "set_lock_task_packages",
            self.admin.set_lock_task_packages(&allowed),
        );
        log_soft("start_lock_task", self.admin.start_lock_task(allowed_package));
        log_soft(
            "set_status_bar_disabled",
            self.admin.set_status_bar_disabled(true),
        );
        log_soft("set_keyguard_disabled", self.admin.set_keyguard_disabled(true));
        log_soft(
            "no_safe_boot",
            self.admin.set_user_restriction("no_safe_boot", true),
        );
        info!("Restricted mode applied (surface: {})", allowed_package);
    }

    /// Symmetric release of `enter_restricted_mode`.
    pub fn exit_restricted_mode(&self) {
        log_soft("stop_lock_task", self.admin.stop_lock_task());
        log_soft("set_lock_task_packages", self.admin.set_lock_task_packages(&[]));
        log_soft(
            "set_status_bar_disabled",
            self.admin.set_status_bar_disabled(false),
        );
        log_soft(
            "set_keyguard_disabled",
            self.admin.set_keyguard_disabled(false),
        );
        log_soft(
            "no_safe_boot",
            self.admin.set_user_restriction("no_safe_boot", false),
        );
        info!("Restricted mode released");
    }

    /// Apply an enterprise policy document field by field. Best-effort
    /// and partial: a failing setter becomes a non-compliance entry and
    /// the remaining fields are still attempted. Empty return = fully
    /// compliant.
    pub fn apply_policy_document(&self, doc: &PolicyDocument) -> Vec<NonComplianceEntry> {
        let mut entries = Vec::new();

        if let Some(v) = doc.camera_disabled {
            record(&mut entries, "cameraDisabled", self.admin.set_camera_disabled(v));
        }
        if let Some(v) = doc.screen_capture_disabled {
            record(
                &mut entries,
                "screenCaptureDisabled",
                self.admin.set_screen_capture_disabled(v),
            );
        }
        if let Some(v) = doc.factory_reset_disabled {
            record(
                &mut entries,
                "factoryResetDisabled",
                self.admin.set_user_restriction("no_factory_reset", v),
            );
        }
        if let Some(v) = doc.safe_boot_disabled {
            record(
                &mut entries,
                "safeBootDisabled",
                self.admin.set_user_restriction("no_safe_boot", v),
            );
        }
        if let Some(v) = doc.usb_file_transfer_disabled {
            record(
                &mut entries,
                "usbFileTransferDisabled",
                self.admin.set_user_restriction("no_usb_file_transfer", v),
            );
        }
        if let Some(v) = doc.install_unknown_sources_disallowed {
            record(
                &mut entries,
                "installUnknownSourcesDisallowed",
                self.admin
                    .set_user_restriction("no_install_unknown_sources", v),
            );
        }
        if let Some(v) = doc.status_bar_disabled {
            record(
                &mut entries,
                "statusBarDisabled",
                self.admin.set_status_bar_disabled(v),
            );
        }
        if let Some(v) = doc.keyguard_disabled {
            record(
                &mut entries,
                "keyguardDisabled",
                self.admin.set_keyguard_disabled(v),
            );
        }
        if let Some(packages) = &doc.hidden_packages {
            let result = packages
                .iter()
                .try_for_each(|p| self.admin.set_app_hidden(p, true));
            record(&mut entries, "hiddenPackages", result);
        }
        if let Some(v) = doc.password_minimum_length {
            record(
                &mut entries,
                "passwordMinimumLength",
                self.admin.set_password_minimum_length(v),
            );
        }

        if entries.is_empty() {
            info!("Policy document fully applied ({} fields)", doc.present_fields());
        } else {
            warn!(
                "Policy document applied with {} non-compliant of {} fields",
                entries.len(),
                doc.present_fields()
            );
        }
        entries
    }

    /// SET_PASSCODE enforcement. The pin was validated at the command
    /// boundary; a platform rejection here is logged, not raised.
    pub fn apply_passcode(&self, pin: &str) {
        log_soft("set_passcode", self.admin.set_passcode(pin));
    }
}

fn log_soft(call: &str, result: Result<(), AdminError>) {
    if let Err(e) = result {
        warn!("Admin call {} failed: {}", call, e);
    }
}

fn record(entries: &mut Vec<NonComplianceEntry>, field: &str, result: Result<(), AdminError>) {
    if let Err(e) = result {
        entries.push(NonComplianceEntry {
            field: field.to_string(),
            reason: e.reason(),
            detail: Some(e.to_string()),
        });
    }
}
