//! Backend HTTP API client.
//!
//! Every call here is treated as unreliable: callers wrap them in the
//! reporter's bounded retries or tolerate a miss until the next natural
//! trigger. Nothing in this module may gate a local enforcement decision.

use crate::config::AgentConfig;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tether_common::{NonComplianceEntry, PolicyDocument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LockAction {
    Lock,
    Unlock,
}

/// Outcome of a lock/unlock action, reported asynchronously.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockOutcomeReport {
    pub report_id: String,
    pub device_id: String,
    pub action: LockAction,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl LockOutcomeReport {
    pub fn new(device_id: &str, action: LockAction, success: bool, error: Option<String>) -> Self {
        Self {
            report_id: uuid::Uuid::new_v4().to_string(),
            device_id: device_id.to_string(),
            action,
            success,
            error,
            occurred_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy_m: Option<f64>,
    pub fixed_at: DateTime<Utc>,
}

/// Backend surface consumed by the agent. A trait so the reporting and
/// sync paths can be exercised against an in-memory backend in tests.
#[async_trait]
pub trait BackendApi: Send + Sync {
    async fn register_push_token(&self, device_id: &str, token: &str) -> Result<()>;
    async fn report_lock_outcome(&self, report: &LockOutcomeReport) -> Result<()>;
    async fn fetch_policy(&self, device_id: &str) -> Result<PolicyDocument>;
    async fn report_compliance(
        &self,
        device_id: &str,
        entries: &[NonComplianceEntry],
    ) -> Result<()>;
    async fn upload_location(&self, device_id: &str, fix: &LocationFix) -> Result<()>;
    async fn heartbeat(&self, device_id: &str) -> Result<()>;
}

pub struct HttpBackend {
    http: reqwest::Client,
    base_url: String,
    credential: Option<String>,
}

impl HttpBackend {
    pub fn new(config: &AgentConfig, credential: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(format!("tetherd/{}", tether_common::VERSION))
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.backend_url.trim_end_matches('/').to_string(),
            credential,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_json<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<()> {
        let mut request = self.http.post(self.url(path)).json(body);
        if let Some(credential) = &self.credential {
            request = request.bearer_auth(credential);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(anyhow!("backend error: {}", response.status()));
        }
        Ok(())
    }
}

#[async_trait]
impl BackendApi for HttpBackend {
    async fn register_push_token(&self, device_id: &str, token: &str) -> Result<()> {
        self.post_json(
            &format!("/v1/devices/{}/push-token", device_id),
            &serde_json::json!({ "token": token }),
        )
        .await
    }

    async fn report_lock_outcome(&self, report: &LockOutcomeReport) -> Result<()> {
        self.post_json(
            &format!("/v1/devices/{}/lock-outcomes", report.device_id),
            report,
        )
        .await
    }

    async fn fetch_policy(&self, device_id: &str) -> Result<PolicyDocument> {
        let mut request = self.http.get(self.url(&format!("/v1/devices/{}/policy", device_id)));
        if let Some(credential) = &self.credential {
            request = request.bearer_auth(credential);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(anyhow!("backend error: {}", response.status()));
        }
        Ok(response.json().await?)
    }

    async fn report_compliance(
        &self,
        device_id: &str,
        entries: &[NonComplianceEntry],
    ) -> Result<()> {
        self.post_json(
            &format!("/v1/devices/{}/compliance", device_id),
            &serde_json::json!({ "nonCompliance": entries }),
        )
        .await
    }

    async fn upload_location(&self, device_id: &str, fix: &LocationFix) -> Result<()> {
        self.post_json(&format!("/v1/devices/{}/locations", device_id), fix)
            .await
    }

    async fn heartbeat(&self, device_id: &str) -> Result<()> {
        self.post_json(
            &format!("/v1/devices/{}/heartbeat", device_id),
            &serde_json::json!({ "at": Utc::now() }),
        )
        .await
    }
}
