//! Durable state store.
//!
//! Owns the persisted DeviceLockState and EnrollmentIdentity. Every
//! read-modify-write runs under one async mutex: concurrent lock and
//! unlock requests serialize here, and the last write wins. The boot
//! mirror is refreshed inside the same critical section, so the
//! synchronous boot fast path can never disagree with the canonical
//! files. Files are written atomically; a write failure is the one
//! fatal error class in the agent and propagates to the caller.

use chrono::Utc;
use std::path::{Path, PathBuf};
use tether_common::fsio;
use tether_common::{BootMirror, DeviceLockState, EnrollmentIdentity};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::warn;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state write failed: {0}")]
    Write(#[from] std::io::Error),
}

struct StoreInner {
    lock_state: DeviceLockState,
    enrollment: EnrollmentIdentity,
}

pub struct StateStore {
    data_dir: PathBuf,
    inner: Mutex<StoreInner>,
}

impl StateStore {
    /// Open the store, reading whatever survived the last process death.
    /// Missing or unparseable files read as the provisioned defaults.
    pub fn open(data_dir: &Path) -> Self {
        let lock_state = fsio::read_json(&data_dir.join("lock_state.json")).unwrap_or_default();
        let enrollment = fsio::read_json(&data_dir.join("enrollment.json")).unwrap_or_default();
        Self {
            data_dir: data_dir.to_path_buf(),
            inner: Mutex::new(StoreInner {
                lock_state,
                enrollment,
            }),
        }
    }

    /// Boot mirror location for the synchronous boot fast path.
    pub fn boot_mirror_path(data_dir: &Path) -> PathBuf {
        data_dir.join("boot_mirror.json")
    }

    fn lock_state_path(&self) -> PathBuf {
        self.data_dir.join("lock_state.json")
    }

    fn enrollment_path(&self) -> PathBuf {
        self.data_dir.join("enrollment.json")
    }

    /// Point-in-time snapshot of the canonical lock state.
    pub async fn lock_state(&self) -> DeviceLockState {
        self.inner.lock().await.lock_state.clone()
    }

    pub async fn enrollment(&self) -> EnrollmentIdentity {
        self.inner.lock().await.enrollment.clone()
    }

    /// Persist the locked state. Disk first, memory second: if the write
    /// fails the in-memory state still matches what is on disk.
    pub async fn set_locked(&self, message: &str) -> Result<DeviceLockState, StoreError> {
        let mut inner = self.inner.lock().await;
        let state = DeviceLockState::locked(message, Utc::now());
        fsio::atomic_write_json(&self.lock_state_path(), &state)?;
        self.write_mirror(&state, &inner.enrollment);
        inner.lock_state = state.clone();
        Ok(state)
    }

    pub async fn set_unlocked(&self) -> Result<DeviceLockState, StoreError> {
        let mut inner = self.inner.lock().await;
        let state = DeviceLockState::Unlocked;
        fsio::atomic_write_json(&self.lock_state_path(), &state)?;
        self.write_mirror(&state, &inner.enrollment);
        inner.lock_state = state.clone();
        Ok(state)
    }

    /// Rewrite the lock message while keeping the original lock time.
    /// Returns None when the device is not locked (SET_MESSAGE is only
    /// effective while locked).
    pub async fn update_message(
        &self,
        message: &str,
    ) -> Result<Option<DeviceLockState>, StoreError> {
        let mut inner = self.inner.lock().await;
        let locked_at = match &inner.lock_state {
            DeviceLockState::Locked { locked_at, .. } => *locked_at,
            DeviceLockState::Unlocked => return Ok(None),
        };
        let state = DeviceLockState::Locked {
            message: message.to_string(),
            locked_at,
        };
        fsio::atomic_write_json(&self.lock_state_path(), &state)?;
        inner.lock_state = state.clone();
        Ok(Some(state))
    }

    pub async fn set_enrollment(&self, identity: EnrollmentIdentity) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        fsio::atomic_write_json(&self.enrollment_path(), &identity)?;
        self.write_mirror(&inner.lock_state, &identity);
        inner.enrollment = identity;
        Ok(())
    }

    /// Persist a rotated push token. Returns true when the token actually
    /// changed (the caller only re-announces in that case).
    pub async fn set_push_token(&self, token: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.enrollment.push_token.as_deref() == Some(token) {
            return Ok(false);
        }
        let mut identity = inner.enrollment.clone();
        identity.push_token = Some(token.to_string());
        fsio::atomic_write_json(&self.enrollment_path(), &identity)?;
        inner.enrollment = identity;
        Ok(true)
    }

    /// Full data-clear back to the provisioned-unlocked state (debug /
    /// test operation).
    pub async fn clear_all(&self) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let lock_state = DeviceLockState::Unlocked;
        let enrollment = EnrollmentIdentity::default();
        fsio::atomic_write_json(&self.lock_state_path(), &lock_state)?;
        fsio::atomic_write_json(&self.enrollment_path(), &enrollment)?;
        self.write_mirror(&lock_state, &enrollment);
        inner.lock_state = lock_state;
        inner.enrollment = enrollment;
        Ok(())
    }

    // The mirror is advisory for the boot fast path; a failed mirror write
    // must not fail the canonical write that already succeeded.
    fn write_mirror(&self, lock_state: &DeviceLockState, enrollment: &EnrollmentIdentity) {
        let mirror = BootMirror {
            is_locked: lock_state.is_locked(),
            setup_complete: enrollment.setup_complete,
        };
        if let Err(e) = mirror.save(&Self::boot_mirror_path(&self.data_dir)) {
            warn!("Failed to refresh boot mirror: {}", e);
        }
    }
}
