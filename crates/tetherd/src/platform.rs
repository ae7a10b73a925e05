//! Host-side capability implementations.
//!
//! The production image wires the vendor bridge (device-owner binder
//! surface, lock activity, fused location) into the capability traits.
//! The host build runs with the stand-ins below, which lets the daemon,
//! control socket, and CLI be exercised end to end on a workstation:
//! lock state persists and reconciles normally, enforcement is recorded
//! in the log, and the capability reads as absent.

use crate::admin::{AdminError, DeviceAdminApi};
use crate::backend::LocationFix;
use crate::locate::LocationProvider;
use crate::presentation::LockSurface;
use tracing::info;

/// No device-owner capability on a workstation; every setter reports
/// `ManagementMode`, which exercises the capability-absent paths.
pub struct HostAdmin;

impl DeviceAdminApi for HostAdmin {
    fn is_device_owner(&self) -> bool {
        false
    }

    fn set_lock_task_packages(&self, _packages: &[String]) -> Result<(), AdminError> {
        Err(AdminError::ManagementMode)
    }

    fn start_lock_task(&self, _package: &str) -> Result<(), AdminError> {
        Err(AdminError::ManagementMode)
    }

    fn stop_lock_task(&self) -> Result<(), AdminError> {
        Err(AdminError::ManagementMode)
    }

    fn set_status_bar_disabled(&self, _disabled: bool) -> Result<(), AdminError> {
        Err(AdminError::ManagementMode)
    }

    fn set_keyguard_disabled(&self, _disabled: bool) -> Result<(), AdminError> {
        Err(AdminError::ManagementMode)
    }

    fn set_user_restriction(&self, _restriction: &str, _active: bool) -> Result<(), AdminError> {
        Err(AdminError::ManagementMode)
    }

    fn set_camera_disabled(&self, _disabled: bool) -> Result<(), AdminError> {
        Err(AdminError::ManagementMode)
    }

    fn set_screen_capture_disabled(&self, _disabled: bool) -> Result<(), AdminError> {
        Err(AdminError::ManagementMode)
    }

    fn set_app_hidden(&self, _package: &str, _hidden: bool) -> Result<(), AdminError> {
        Err(AdminError::ManagementMode)
    }

    fn set_password_minimum_length(&self, _length: u32) -> Result<(), AdminError> {
        Err(AdminError::ManagementMode)
    }

    fn set_passcode(&self, _pin: &str) -> Result<(), AdminError> {
        Err(AdminError::ManagementMode)
    }
}

/// Logs what the lock activity would do on a handset.
pub struct HostSurface;

impl LockSurface for HostSurface {
    fn show(&self, message: &str) {
        info!("[lock surface] SHOW: {}", message);
    }

    fn bring_to_front(&self) {
        info!("[lock surface] BRING TO FRONT");
    }

    fn dismiss(&self) {
        info!("[lock surface] DISMISS");
    }
}

/// No location hardware on a workstation.
pub struct HostLocation;

impl LocationProvider for HostLocation {
    fn current_fix(&self) -> Option<LocationFix> {
        None
    }
}
