//! Lock surface presentation state machine.
//!
//! Guarantees that whenever the persisted state says locked, a blocking
//! full-screen surface is visible and not dismissible by normal
//! navigation. Every path that shows or dismisses the surface re-reads
//! the store as its final step: triggers can be stale (an unlock command
//! racing a screen-on event), and the freshest persisted state wins.
//! Trusting the dismiss event alone is a bug.

use crate::store::StateStore;
use std::sync::{Arc, Mutex};
use tether_common::DeviceLockState;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentationState {
    NotShown,
    ShownEnforced,
    Dismissing,
}

/// Hardware navigation signals intercepted while enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavKey {
    Back,
    Home,
    Recents,
    Menu,
}

/// The platform surface that actually renders the blocking screen.
pub trait LockSurface: Send + Sync {
    fn show(&self, message: &str);
    fn bring_to_front(&self);
    fn dismiss(&self);
}

pub struct LockPresentation {
    surface: Arc<dyn LockSurface>,
    store: Arc<StateStore>,
    state: Mutex<PresentationState>,
}

impl LockPresentation {
    pub fn new(surface: Arc<dyn LockSurface>, store: Arc<StateStore>) -> Self {
        Self {
            surface,
            store,
            state: Mutex::new(PresentationState::NotShown),
        }
    }

    pub fn state(&self) -> PresentationState {
        *self.state.lock().unwrap()
    }

    /// Converge the surface to the freshest persisted state. Used by
    /// boot handling, screen-on handling, the reconciler after a lock,
    /// and the surface's own startup path.
    pub async fn sync(&self) {
        match self.store.lock_state().await {
            DeviceLockState::Locked { message, .. } => {
                *self.state.lock().unwrap() = PresentationState::ShownEnforced;
                // show() is idempotent; re-showing refreshes the message.
                self.surface.show(&message);
            }
            DeviceLockState::Unlocked => self.dismiss_if_shown(),
        }
    }

    /// Fire-and-forget dismiss signal from the reconciler. No-op when
    /// nothing is shown. Re-checks the store: a stale dismiss racing a
    /// newer lock must not take the surface down.
    pub async fn notify_dismiss(&self) {
        match self.store.lock_state().await {
            DeviceLockState::Locked { .. } => {
                debug!("Dismiss signal ignored: store says locked");
            }
            DeviceLockState::Unlocked => self.dismiss_if_shown(),
        }
    }

    /// Self-healing: the platform reports the surface lost foreground or
    /// its task was backgrounded. Re-assert while the store says locked.
    pub async fn on_focus_lost(&self) {
        let shown = self.state() == PresentationState::ShownEnforced;
        if shown && self.store.lock_state().await.is_locked() {
            info!("Lock surface lost foreground; bringing back to front");
            self.surface.bring_to_front();
        }
    }

    /// Back/home/recents/menu are consumed (no-op) while enforced.
    pub fn intercepts(&self, key: NavKey) -> bool {
        let enforced = self.state() == PresentationState::ShownEnforced;
        if enforced {
            debug!("Intercepted {:?} while lock surface enforced", key);
        }
        enforced
    }

    fn dismiss_if_shown(&self) {
        let mut state = self.state.lock().unwrap();
        if *state == PresentationState::ShownEnforced {
            *state = PresentationState::Dismissing;
            self.surface.dismiss();
            *state = PresentationState::NotShown;
            info!("Lock surface dismissed");
        }
    }
}
