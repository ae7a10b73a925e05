//! Reporting sink - fire-and-forget backend reporting.
//!
//! The reconciler never waits for or branches on anything here. Each
//! report runs on its own spawned task with bounded linear backoff; a
//! terminal failure is logged and dropped, never escalated to local
//! device state.

use crate::backend::{BackendApi, LocationFix, LockAction, LockOutcomeReport};
use crate::store::StateStore;
use anyhow::Result;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Run a fallible async operation with bounded linear backoff
/// (delay, 2*delay, ... between attempts). Returns the last error when
/// every attempt failed.
pub async fn with_retries<T, F, Fut>(
    label: &str,
    attempts: u32,
    base_delay: Duration,
    op: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_err = None;
    for attempt in 1..=attempts.max(1) {
        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!("{} succeeded on attempt {}", label, attempt);
                }
                return Ok(value);
            }
            Err(e) => {
                warn!("{} attempt {}/{} failed: {}", label, attempt, attempts, e);
                last_err = Some(e);
                if attempt < attempts {
                    tokio::time::sleep(base_delay * attempt).await;
                }
            }
        }
    }
    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("{} failed", label)))
}

pub struct Reporter {
    backend: Arc<dyn BackendApi>,
    store: Arc<StateStore>,
    attempts: u32,
    base_delay: Duration,
}

impl Reporter {
    pub fn new(
        backend: Arc<dyn BackendApi>,
        store: Arc<StateStore>,
        attempts: u32,
        base_delay: Duration,
    ) -> Self {
        Self {
            backend,
            store,
            attempts,
            base_delay,
        }
    }

    /// Queue a lock/unlock outcome report. Returns immediately; the
    /// network round-trip happens on the spawned task.
    pub fn report_lock_outcome(
        &self,
        action: LockAction,
        success: bool,
        error: Option<String>,
    ) -> JoinHandle<()> {
        let backend = Arc::clone(&self.backend);
        let store = Arc::clone(&self.store);
        let (attempts, base_delay) = (self.attempts, self.base_delay);
        tokio::spawn(async move {
            let device_id = store.enrollment().await.device_id;
            let report = LockOutcomeReport::new(&device_id, action, success, error);
            let outcome = with_retries("lock outcome report", attempts, base_delay, || {
                backend.report_lock_outcome(&report)
            })
            .await;
            if let Err(e) = outcome {
                warn!("Dropping lock outcome report after retries: {}", e);
            }
        })
    }

    pub fn report_compliance(
        &self,
        entries: Vec<tether_common::NonComplianceEntry>,
    ) -> JoinHandle<()> {
        let backend = Arc::clone(&self.backend);
        let store = Arc::clone(&self.store);
        let (attempts, base_delay) = (self.attempts, self.base_delay);
        tokio::spawn(async move {
            let device_id = store.enrollment().await.device_id;
            let outcome = with_retries("compliance report", attempts, base_delay, || {
                backend.report_compliance(&device_id, &entries)
            })
            .await;
            if let Err(e) = outcome {
                warn!("Dropping compliance report after retries: {}", e);
            }
        })
    }

    pub fn upload_location(&self, fix: LocationFix) -> JoinHandle<()> {
        let backend = Arc::clone(&self.backend);
        let store = Arc::clone(&self.store);
        let (attempts, base_delay) = (self.attempts, self.base_delay);
        tokio::spawn(async move {
            let device_id = store.enrollment().await.device_id;
            let outcome = with_retries("location upload", attempts, base_delay, || {
                backend.upload_location(&device_id, &fix)
            })
            .await;
            if let Err(e) = outcome {
                warn!("Dropping location fix after retries: {}", e);
            }
        })
    }

    pub fn heartbeat(&self) -> JoinHandle<()> {
        let backend = Arc::clone(&self.backend);
        let store = Arc::clone(&self.store);
        let (attempts, base_delay) = (self.attempts, self.base_delay);
        tokio::spawn(async move {
            let device_id = store.enrollment().await.device_id;
            let outcome = with_retries("heartbeat", attempts, base_delay, || {
                backend.heartbeat(&device_id)
            })
            .await;
            if let Err(e) = outcome {
                debug!("Heartbeat dropped after retries: {}", e);
            }
        })
    }
}
