//! Trigger-source event handling.
//!
//! One `EventHandler` method per trigger kind, implemented by a single
//! adapter in front of the reconciler, so the bridge surface (control
//! socket, platform broadcasts) stays free of enforcement logic. Boot and
//! screen handlers run under the platform's broadcast time budget: they
//! only touch local state and spawn anything that talks to the network.

use crate::admin::PolicyEnforcer;
use crate::backend::BackendApi;
use crate::dedup::CommandDeduplicator;
use crate::identity::PushTokenManager;
use crate::locate::Locator;
use crate::reconciler::{Reconciler, TriggerOrigin};
use crate::reporter::Reporter;
use crate::store::{StateStore, StoreError};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tether_common::RemoteCommand;
use tracing::{info, warn};

/// What the ingestion point should tell the transport bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandDisposition {
    /// Command accepted and enacted (or legitimately a no-op).
    Applied,
    /// Malformed, unknown, or suppressed as a duplicate. Logged; the
    /// transport must not redeliver.
    Ignored,
}

/// One method per trigger kind. The concrete adapter below is the only
/// implementation in the daemon; tests drive it directly.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn on_boot(&self);
    async fn on_screen_on(&self);
    async fn on_command(
        &self,
        kind: &str,
        payload: serde_json::Value,
    ) -> Result<CommandDisposition, StoreError>;
    async fn on_monitor_tick(&self);
    async fn on_token_refresh(&self, token: &str) -> Result<(), StoreError>;
}

pub struct AgentEventHandler {
    store: Arc<StateStore>,
    reconciler: Arc<Reconciler>,
    dedup: Arc<CommandDeduplicator>,
    enforcer: Arc<PolicyEnforcer>,
    reporter: Arc<Reporter>,
    identity: Arc<PushTokenManager>,
    locator: Arc<Locator>,
    backend: Arc<dyn BackendApi>,
}

impl AgentEventHandler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<StateStore>,
        reconciler: Arc<Reconciler>,
        dedup: Arc<CommandDeduplicator>,
        enforcer: Arc<PolicyEnforcer>,
        reporter: Arc<Reporter>,
        identity: Arc<PushTokenManager>,
        locator: Arc<Locator>,
        backend: Arc<dyn BackendApi>,
    ) -> Self {
        Self {
            store,
            reconciler,
            dedup,
            enforcer,
            reporter,
            identity,
            locator,
            backend,
        }
    }

    /// Fetch, apply, and report the enterprise policy. Scheduled
    /// periodically; also safe to run ad hoc.
    pub async fn compliance_sync(&self) {
        let enrollment = self.store.enrollment().await;
        if enrollment.device_id.is_empty() {
            info!("Compliance sync skipped: not enrolled");
            return;
        }
        match self.backend.fetch_policy(&enrollment.device_id).await {
            Ok(doc) => {
                let entries = self.enforcer.apply_policy_document(&doc);
                self.reporter.report_compliance(entries);
            }
            // Soft failure; the next scheduled sync is the retry.
            Err(e) => warn!("Policy fetch failed: {}", e),
        }
    }
}

#[async_trait]
impl EventHandler for AgentEventHandler {
    /// Boot completion: re-derive enforcement purely from persisted
    /// state, then kick the network-touching work onto its own tasks.
    async fn on_boot(&self) {
        self.reconciler.sync_enforcement(TriggerOrigin::Boot).await;
        self.identity.spawn_announce();
    }

    async fn on_screen_on(&self) {
        self.reconciler.sync_enforcement(TriggerOrigin::ScreenOn).await;
    }

    async fn on_command(
        &self,
        kind: &str,
        payload: serde_json::Value,
    ) -> Result<CommandDisposition, StoreError> {
        let command = match RemoteCommand::parse(kind, &payload) {
            Ok(command) => command,
            Err(e) => {
                // Rejected at the command boundary; no state mutation.
                warn!("Rejected remote command: {}", e);
                return Ok(CommandDisposition::Ignored);
            }
        };

        if !self.dedup.accept(command.kind(), Instant::now()) {
            info!("Suppressed duplicate {} command", command.kind().as_str());
            return Ok(CommandDisposition::Ignored);
        }

        match command {
            RemoteCommand::Lock { message } => {
                self.reconciler
                    .request_lock(&message, TriggerOrigin::Push)
                    .await?;
            }
            RemoteCommand::Unlock => {
                self.reconciler.request_unlock(TriggerOrigin::Push).await?;
            }
            RemoteCommand::SetMessage { message } => {
                self.reconciler
                    .set_message(&message, TriggerOrigin::Push)
                    .await?;
            }
            RemoteCommand::LocateNow => self.locator.locate_now(),
            RemoteCommand::SetPasscode { pin } => self.enforcer.apply_passcode(&pin),
            RemoteCommand::Ping => {
                self.reporter.heartbeat();
            }
        }
        Ok(CommandDisposition::Applied)
    }

    async fn on_monitor_tick(&self) {
        self.reconciler.sync_enforcement(TriggerOrigin::Monitor).await;
    }

    async fn on_token_refresh(&self, token: &str) -> Result<(), StoreError> {
        self.identity.on_new_token(token).await
    }
}
