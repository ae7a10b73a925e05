//! Location provider seam and the locate-now flow.

use crate::backend::LocationFix;
use crate::reporter::Reporter;
use std::sync::Arc;
use tracing::{info, warn};

/// Platform location source. Returns None when no fix is available
/// (location off, no recent fix); the upload is simply skipped.
pub trait LocationProvider: Send + Sync {
    fn current_fix(&self) -> Option<LocationFix>;
}

pub struct Locator {
    provider: Arc<dyn LocationProvider>,
    reporter: Arc<Reporter>,
}

impl Locator {
    pub fn new(provider: Arc<dyn LocationProvider>, reporter: Arc<Reporter>) -> Self {
        Self { provider, reporter }
    }

    /// Grab the current fix and queue its upload. Fire-and-forget: the
    /// network round-trip happens on the reporter's spawned task.
    pub fn locate_now(&self) {
        match self.provider.current_fix() {
            Some(fix) => {
                info!(
                    "Location fix acquired ({:.5}, {:.5})",
                    fix.latitude, fix.longitude
                );
                self.reporter.upload_location(fix);
            }
            None => warn!("No location fix available"),
        }
    }
}
