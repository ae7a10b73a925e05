//! Push-registration token lifecycle.
//!
//! The platform rotates tokens at will, independent of lock-state logic.
//! The persisted token is the source of truth for "does the backend need
//! to hear the new one": announce failures back off linearly, give up
//! silently, and self-heal on the next natural trigger (daemon restart,
//! periodic resync).

use crate::backend::BackendApi;
use crate::reporter::with_retries;
use crate::store::{StateStore, StoreError};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub struct PushTokenManager {
    store: Arc<StateStore>,
    backend: Arc<dyn BackendApi>,
    attempts: u32,
    base_delay: Duration,
    /// Token the backend last acknowledged, this process lifetime only.
    /// Restart clears it, which is exactly what makes a missed
    /// announcement self-heal on the next startup.
    announced: Arc<Mutex<Option<String>>>,
}

impl PushTokenManager {
    pub fn new(
        store: Arc<StateStore>,
        backend: Arc<dyn BackendApi>,
        attempts: u32,
        base_delay: Duration,
    ) -> Self {
        Self {
            store,
            backend,
            attempts,
            base_delay,
            announced: Arc::new(Mutex::new(None)),
        }
    }

    /// Handle a platform token rotation: persist first, then announce.
    /// A persistence failure propagates so the bridge can redeliver.
    pub async fn on_new_token(&self, token: &str) -> Result<(), StoreError> {
        let changed = self.store.set_push_token(token).await?;
        if changed {
            info!("Push token rotated; announcing to backend");
        } else {
            debug!("Push token unchanged");
        }
        self.spawn_announce();
        Ok(())
    }

    /// Re-announce the persisted token unless the backend already heard
    /// it this process lifetime. Called on startup and periodic resync.
    pub fn spawn_announce(&self) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let backend = Arc::clone(&self.backend);
        let announced = Arc::clone(&self.announced);
        let (attempts, base_delay) = (self.attempts, self.base_delay);
        tokio::spawn(async move {
            let enrollment = store.enrollment().await;
            let token = match enrollment.push_token {
                Some(token) => token,
                None => {
                    debug!("No push token persisted yet; nothing to announce");
                    return;
                }
            };
            if announced.lock().unwrap().as_deref() == Some(token.as_str()) {
                debug!("Push token already announced");
                return;
            }
            let result = with_retries("push token announce", attempts, base_delay, || {
                backend.register_push_token(&enrollment.device_id, &token)
            })
            .await;
            match result {
                Ok(()) => {
                    *announced.lock().unwrap() = Some(token);
                    info!("Push token announced");
                }
                // Give up silently until the next natural trigger.
                Err(e) => warn!("Push token announce failed, will retry later: {}", e),
            }
        })
    }
}
