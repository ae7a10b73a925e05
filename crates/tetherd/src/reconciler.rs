//! Lock-state reconciler.
//!
//! The single authority for "should this device be locked, and with what
//! message". All trigger sources funnel into `request_lock` and
//! `request_unlock`. Ordering is persist-first: the store write is the
//! recovery anchor, and kiosk enforcement plus surface presentation are
//! retryable best-effort steps that any later trigger re-drives. A crash
//! between steps can therefore never leave the store claiming one thing
//! while recovery derives another.

use crate::admin::PolicyEnforcer;
use crate::backend::LockAction;
use crate::presentation::LockPresentation;
use crate::reporter::Reporter;
use crate::store::{StateStore, StoreError};
use std::sync::Arc;
use tether_common::DeviceLockState;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Where a trigger came from. Used for reporting and logging only -
/// every origin is equally authoritative here, authentication happened
/// upstream at the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOrigin {
    Boot,
    ScreenOn,
    Monitor,
    Push,
    Admin,
}

impl TriggerOrigin {
    /// Remote-originated triggers report their outcome to the backend;
    /// local re-drives (boot, screen, monitor) do not.
    fn reports_outcome(&self) -> bool {
        matches!(self, TriggerOrigin::Push | TriggerOrigin::Admin)
    }
}

/// What a reconciliation request actually did. Success is defined by the
/// store write alone; `enforced` records whether kiosk enforcement could
/// be applied right now.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub state: DeviceLockState,
    pub enforced: bool,
}

pub struct Reconciler {
    store: Arc<StateStore>,
    enforcer: Arc<PolicyEnforcer>,
    presentation: Arc<LockPresentation>,
    reporter: Arc<Reporter>,
    lock_surface_package: String,
    // Serializes whole lock/unlock sequences so racing triggers resolve
    // to exactly one consistent final state.
    op_gate: Mutex<()>,
}

impl Reconciler {
    pub fn new(
        store: Arc<StateStore>,
        enforcer: Arc<PolicyEnforcer>,
        presentation: Arc<LockPresentation>,
        reporter: Arc<Reporter>,
        lock_surface_package: String,
    ) -> Self {
        Self {
            store,
            enforcer,
            presentation,
            reporter,
            lock_surface_package,
            op_gate: Mutex::new(()),
        }
    }

    /// Lock the device. Persists first; succeeds as soon as the store
    /// write lands. Calling while already locked overwrites the message
    /// and re-applies enforcement - never an error.
    pub async fn request_lock(
        &self,
        message: &str,
        origin: TriggerOrigin,
    ) -> Result<Outcome, StoreError> {
        let _gate = self.op_gate.lock().await;
        info!("Lock requested (origin {:?})", origin);

        let state = match self.store.set_locked(message).await {
            Ok(state) => state,
            Err(e) => {
                // The operation did not happen; the transport layer may
                // redeliver. Tell the backend what we know.
                if origin.reports_outcome() {
                    self.reporter
                        .report_lock_outcome(LockAction::Lock, false, Some(e.to_string()));
                }
                return Err(e);
            }
        };

        let enforced = self.apply_lock_enforcement();
        self.presentation.sync().await;

        if origin.reports_outcome() {
            self.reporter.report_lock_outcome(LockAction::Lock, true, None);
        }
        Ok(Outcome { state, enforced })
    }

    /// Unlock the device. Symmetric to `request_lock`; the dismiss signal
    /// to the surface is fire-and-forget, and the surface re-checks state
    /// on its own startup path anyway.
    pub async fn request_unlock(&self, origin: TriggerOrigin) -> Result<Outcome, StoreError> {
        let _gate = self.op_gate.lock().await;
        info!("Unlock requested (origin {:?})", origin);

        let state = match self.store.set_unlocked().await {
            Ok(state) => state,
            Err(e) => {
                if origin.reports_outcome() {
                    self.reporter
                        .report_lock_outcome(LockAction::Unlock, false, Some(e.to_string()));
                }
                return Err(e);
            }
        };

        let enforced = if self.enforcer.is_capable() {
            self.enforcer.exit_restricted_mode();
            true
        } else {
            false
        };
        self.presentation.notify_dismiss().await;

        if origin.reports_outcome() {
            self.reporter
                .report_lock_outcome(LockAction::Unlock, true, None);
        }
        Ok(Outcome { state, enforced })
    }

    /// Rewrite the operator message. Only effective while locked; returns
    /// false (and changes nothing) otherwise.
    pub async fn set_message(
        &self,
        message: &str,
        origin: TriggerOrigin,
    ) -> Result<bool, StoreError> {
        let _gate = self.op_gate.lock().await;
        match self.store.update_message(message).await? {
            Some(_) => {
                info!("Lock message updated (origin {:?})", origin);
                self.presentation.sync().await;
                Ok(true)
            }
            None => {
                info!("SET_MESSAGE ignored: device not locked (origin {:?})", origin);
                Ok(false)
            }
        }
    }

    /// Re-derive desired enforcement purely from persisted state, with no
    /// reliance on anything in memory. This is the recovery path run on
    /// boot, screen-on, and the periodic monitor tick.
    pub async fn sync_enforcement(&self, origin: TriggerOrigin) {
        let _gate = self.op_gate.lock().await;
        let state = self.store.lock_state().await;
        match &state {
            DeviceLockState::Locked { .. } => {
                info!("Re-driving lock enforcement (origin {:?})", origin);
                self.apply_lock_enforcement();
            }
            DeviceLockState::Unlocked => {
                // A crash mid-unlock can leave restrictions applied with
                // an unlocked store; release them on every re-derive.
                if self.enforcer.is_capable() {
                    self.enforcer.exit_restricted_mode();
                }
            }
        }
        self.presentation.sync().await;
    }

    fn apply_lock_enforcement(&self) -> bool {
        if self.enforcer.is_capable() {
            self.enforcer.enter_restricted_mode(&self.lock_surface_package);
            true
        } else {
            // The logical lock state stays authoritative even when we
            // cannot physically enforce it right now.
            warn!("Device owner capability absent; lock recorded without kiosk enforcement");
            false
        }
    }
}
