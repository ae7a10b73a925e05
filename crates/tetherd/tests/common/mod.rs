//! Shared mocks for the tetherd integration suites.

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tether_common::{EnrollmentIdentity, NonComplianceEntry, PolicyDocument};
use tetherd::admin::{AdminError, DeviceAdminApi};
use tetherd::backend::{BackendApi, LocationFix, LockOutcomeReport};
use tetherd::config::AgentConfig;
use tetherd::context::AgentContext;
use tetherd::locate::LocationProvider;
use tetherd::presentation::LockSurface;

/// Records every admin call; individual methods can be made to fail.
pub struct MockAdmin {
    owner: AtomicBool,
    calls: Mutex<Vec<String>>,
    failures: Mutex<HashMap<String, AdminError>>,
}

impl MockAdmin {
    pub fn new(owner: bool) -> Arc<Self> {
        Arc::new(Self {
            owner: AtomicBool::new(owner),
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
        })
    }

    pub fn set_owner(&self, owner: bool) {
        self.owner.store(owner, Ordering::SeqCst);
    }

    /// Make the named call fail from now on.
    pub fn fail(&self, call: &str, error: AdminError) {
        self.failures.lock().unwrap().insert(call.to_string(), error);
    }

    pub fn invocations(&self, call: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == call)
            .count()
    }

    fn record(&self, call: &str) -> Result<(), AdminError> {
        self.calls.lock().unwrap().push(call.to_string());
        match self.failures.lock().unwrap().get(call) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

impl DeviceAdminApi for MockAdmin {
    fn is_device_owner(&self) -> bool {
        self.owner.load(Ordering::SeqCst)
    }

    fn set_lock_task_packages(&self, _packages: &[String]) -> Result<(), AdminError> {
        self.record("set_lock_task_packages")
    }

    fn start_lock_task(&self, _package: &str) -> Result<(), AdminError> {
        self.record("start_lock_task")
    }

    fn stop_lock_task(&self) -> Result<(), AdminError> {
        self.record("stop_lock_task")
    }

    fn set_status_bar_disabled(&self, _disabled: bool) -> Result<(), AdminError> {
        self.record("set_status_bar_disabled")
    }

    fn set_keyguard_disabled(&self, _disabled: bool) -> Result<(), AdminError> {
        self.record("set_keyguard_disabled")
    }

    fn set_user_restriction(&self, restriction: &str, _active: bool) -> Result<(), AdminError> {
        self.record(&format!("set_user_restriction:{}", restriction))
    }

    fn set_camera_disabled(&self, _disabled: bool) -> Result<(), AdminError> {
        self.record("set_camera_disabled")
    }

    fn set_screen_capture_disabled(&self, _disabled: bool) -> Result<(), AdminError> {
        self.record("set_screen_capture_disabled")
    }

    fn set_app_hidden(&self, _package: &str, _hidden: bool) -> Result<(), AdminError> {
        self.record("set_app_hidden")
    }

    fn set_password_minimum_length(&self, _length: u32) -> Result<(), AdminError> {
        self.record("set_password_minimum_length")
    }

    fn set_passcode(&self, _pin: &str) -> Result<(), AdminError> {
        self.record("set_passcode")
    }
}

/// Records surface transitions and the last shown message.
#[derive(Default)]
pub struct MockSurface {
    pub shown_message: Mutex<Option<String>>,
    pub show_count: AtomicU32,
    pub front_count: AtomicU32,
    pub dismiss_count: AtomicU32,
}

impl MockSurface {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn shown(&self) -> Option<String> {
        self.shown_message.lock().unwrap().clone()
    }
}

impl LockSurface for MockSurface {
    fn show(&self, message: &str) {
        *self.shown_message.lock().unwrap() = Some(message.to_string());
        self.show_count.fetch_add(1, Ordering::SeqCst);
    }

    fn bring_to_front(&self) {
        self.front_count.fetch_add(1, Ordering::SeqCst);
    }

    fn dismiss(&self) {
        *self.shown_message.lock().unwrap() = None;
        self.dismiss_count.fetch_add(1, Ordering::SeqCst);
    }
}

/// In-memory backend that records every call. `delay` simulates network
/// latency; `failing` makes every call error (for retry/backoff tests).
pub struct MockBackend {
    pub delay: Duration,
    pub failing: AtomicBool,
    pub lock_outcomes: Mutex<Vec<LockOutcomeReport>>,
    pub compliance_reports: Mutex<Vec<Vec<NonComplianceEntry>>>,
    pub registered_tokens: Mutex<Vec<String>>,
    pub locations: Mutex<Vec<LocationFix>>,
    pub heartbeats: AtomicU32,
    pub policy: Mutex<PolicyDocument>,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Self::with_delay(Duration::ZERO)
    }

    pub fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            failing: AtomicBool::new(false),
            lock_outcomes: Mutex::new(Vec::new()),
            compliance_reports: Mutex::new(Vec::new()),
            registered_tokens: Mutex::new(Vec::new()),
            locations: Mutex::new(Vec::new()),
            heartbeats: AtomicU32::new(0),
            policy: Mutex::new(PolicyDocument::default()),
        })
    }

    async fn gate(&self) -> Result<()> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow!("backend unreachable"));
        }
        Ok(())
    }
}

#[async_trait]
impl BackendApi for MockBackend {
    async fn register_push_token(&self, _device_id: &str, token: &str) -> Result<()> {
        self.gate().await?;
        self.registered_tokens.lock().unwrap().push(token.to_string());
        Ok(())
    }

    async fn report_lock_outcome(&self, report: &LockOutcomeReport) -> Result<()> {
        self.gate().await?;
        self.lock_outcomes.lock().unwrap().push(report.clone());
        Ok(())
    }

    async fn fetch_policy(&self, _device_id: &str) -> Result<PolicyDocument> {
        self.gate().await?;
        Ok(self.policy.lock().unwrap().clone())
    }

    async fn report_compliance(
        &self,
        _device_id: &str,
        entries: &[NonComplianceEntry],
    ) -> Result<()> {
        self.gate().await?;
        self.compliance_reports.lock().unwrap().push(entries.to_vec());
        Ok(())
    }

    async fn upload_location(&self, _device_id: &str, fix: &LocationFix) -> Result<()> {
        self.gate().await?;
        self.locations.lock().unwrap().push(fix.clone());
        Ok(())
    }

    async fn heartbeat(&self, _device_id: &str) -> Result<()> {
        self.gate().await?;
        self.heartbeats.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct NoLocation;

impl LocationProvider for NoLocation {
    fn current_fix(&self) -> Option<LocationFix> {
        None
    }
}

/// Context over a temp dir with mocks and instant retry backoff.
pub fn build_ctx(
    temp: &TempDir,
    admin: Arc<MockAdmin>,
    surface: Arc<MockSurface>,
    backend: Arc<MockBackend>,
) -> Arc<AgentContext> {
    let mut config = AgentConfig::with_root(temp.path());
    config.report_backoff_secs = 0;
    AgentContext::new(config, admin, surface, Arc::new(NoLocation), backend)
}

/// Provision the store so reports carry a device id.
pub async fn enroll(ctx: &AgentContext) {
    ctx.store
        .set_enrollment(EnrollmentIdentity {
            device_id: "dev-42".to_string(),
            tenant_id: "shop-7".to_string(),
            setup_complete: true,
            ..Default::default()
        })
        .await
        .unwrap();
}
