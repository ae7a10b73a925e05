//! Agent context - explicit wiring of every component.
//!
//! Constructed once at process start and handed around by reference.
//! There are no global singletons in the daemon: anything a component
//! needs arrives through here.

use crate::admin::{DeviceAdminApi, PolicyEnforcer};
use crate::backend::BackendApi;
use crate::config::AgentConfig;
use crate::dedup::CommandDeduplicator;
use crate::events::AgentEventHandler;
use crate::identity::PushTokenManager;
use crate::locate::{LocationProvider, Locator};
use crate::monitor::PeriodicScheduler;
use crate::presentation::{LockPresentation, LockSurface};
use crate::reconciler::Reconciler;
use crate::reporter::Reporter;
use crate::store::StateStore;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tether_common::rpc::StatusData;

pub struct AgentContext {
    pub config: AgentConfig,
    pub store: Arc<StateStore>,
    pub enforcer: Arc<PolicyEnforcer>,
    pub presentation: Arc<LockPresentation>,
    pub reporter: Arc<Reporter>,
    pub reconciler: Arc<Reconciler>,
    pub dedup: Arc<CommandDeduplicator>,
    pub identity: Arc<PushTokenManager>,
    pub locator: Arc<Locator>,
    pub handler: Arc<AgentEventHandler>,
    pub scheduler: Arc<PeriodicScheduler>,
    pub backend: Arc<dyn BackendApi>,
    pub started_at: Instant,
}

impl AgentContext {
    /// Wire the full component graph over the given platform capabilities.
    /// The production binary passes the vendor bridge implementations;
    /// tests pass mocks and a temp-dir config.
    pub fn new(
        config: AgentConfig,
        admin: Arc<dyn DeviceAdminApi>,
        surface: Arc<dyn LockSurface>,
        location: Arc<dyn LocationProvider>,
        backend: Arc<dyn BackendApi>,
    ) -> Arc<Self> {
        let backoff = Duration::from_secs(config.report_backoff_secs);

        let store = Arc::new(StateStore::open(&config.data_dir));
        let enforcer = Arc::new(PolicyEnforcer::new(admin));
        let presentation = Arc::new(LockPresentation::new(surface, Arc::clone(&store)));
        let reporter = Arc::new(Reporter::new(
            Arc::clone(&backend),
            Arc::clone(&store),
            config.report_attempts,
            backoff,
        ));
        let reconciler = Arc::new(Reconciler::new(
            Arc::clone(&store),
            Arc::clone(&enforcer),
            Arc::clone(&presentation),
            Arc::clone(&reporter),
            config.lock_surface_package.clone(),
        ));
        let dedup = Arc::new(CommandDeduplicator::new(Duration::from_secs(
            config.dedup_window_secs,
        )));
        let identity = Arc::new(PushTokenManager::new(
            Arc::clone(&store),
            Arc::clone(&backend),
            config.report_attempts,
            backoff,
        ));
        let locator = Arc::new(Locator::new(location, Arc::clone(&reporter)));
        let handler = Arc::new(AgentEventHandler::new(
            Arc::clone(&store),
            Arc::clone(&reconciler),
            Arc::clone(&dedup),
            Arc::clone(&enforcer),
            Arc::clone(&reporter),
            Arc::clone(&identity),
            Arc::clone(&locator),
            Arc::clone(&backend),
        ));

        Arc::new(Self {
            config,
            store,
            enforcer,
            presentation,
            reporter,
            reconciler,
            dedup,
            identity,
            locator,
            handler,
            scheduler: Arc::new(PeriodicScheduler::new()),
            backend,
            started_at: Instant::now(),
        })
    }

    /// Snapshot for `tetherctl status`.
    pub async fn status(&self) -> StatusData {
        let lock_state = self.store.lock_state().await;
        let enrollment = self.store.enrollment().await;
        StatusData {
            version: tether_common::VERSION.to_string(),
            pid: std::process::id(),
            uptime_secs: self.started_at.elapsed().as_secs(),
            is_locked: lock_state.is_locked(),
            lock_message: lock_state.message().map(|m| m.to_string()),
            locked_at: lock_state.locked_at(),
            device_owner: self.enforcer.is_capable(),
            device_id: enrollment.device_id.clone(),
            tenant_id: enrollment.tenant_id.clone(),
            setup_complete: enrollment.setup_complete,
            push_token_registered: enrollment.push_token.is_some(),
        }
    }
}
