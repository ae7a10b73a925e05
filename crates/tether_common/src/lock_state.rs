//! Canonical device lock state.
//!
//! The lock flag, operator message, and lock timestamp always move
//! together: a reader can never observe a locked device without a message,
//! or an unlocked device that still carries one. The enum makes that
//! pairing structural instead of a runtime check.

use crate::fsio;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Fallback shown when a lock command arrives with an empty message.
pub const DEFAULT_LOCK_MESSAGE: &str =
    "This device has been locked by the retailer. Please contact the shop to settle your balance.";

/// The canonical lock state, owned by the durable store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DeviceLockState {
    Unlocked,
    Locked {
        message: String,
        locked_at: DateTime<Utc>,
    },
}

impl Default for DeviceLockState {
    fn default() -> Self {
        DeviceLockState::Unlocked
    }
}

impl DeviceLockState {
    /// Build a locked state, substituting the default message for an
    /// empty one so the lock surface never renders blank.
    pub fn locked(message: &str, now: DateTime<Utc>) -> Self {
        let message = if message.trim().is_empty() {
            DEFAULT_LOCK_MESSAGE.to_string()
        } else {
            message.to_string()
        };
        DeviceLockState::Locked {
            message,
            locked_at: now,
        }
    }

    pub fn is_locked(&self) -> bool {
        matches!(self, DeviceLockState::Locked { .. })
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            DeviceLockState::Locked { message, .. } => Some(message),
            DeviceLockState::Unlocked => None,
        }
    }

    pub fn locked_at(&self) -> Option<DateTime<Utc>> {
        match self {
            DeviceLockState::Locked { locked_at, .. } => Some(*locked_at),
            DeviceLockState::Unlocked => None,
        }
    }
}

/// Synchronously readable mirror of the fields the boot path needs before
/// the async store is up. The OS boot broadcast runs under a strict time
/// budget, so this file is read with plain blocking I/O.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootMirror {
    pub is_locked: bool,
    pub setup_complete: bool,
}

impl BootMirror {
    /// Blocking read for the boot fast path. Missing or unparseable file
    /// reads as the provisioned-unlocked default.
    pub fn load_sync(path: &Path) -> Self {
        fsio::read_json(path).unwrap_or_default()
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        fsio::atomic_write_json(path, self)
    }
}
