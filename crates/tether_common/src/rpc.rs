//! JSON-RPC 2.0 types for the tetherd control socket.
//!
//! The socket is the daemon's single ingestion point: tetherctl sends
//! admin actions, the platform push bridge forwards remote commands, and
//! the platform event bridge forwards boot / screen broadcasts. Protocol
//! is newline-delimited JSON over a Unix domain socket.

use serde::{Deserialize, Serialize};

/// Control socket path (runtime directory managed by the init system).
pub const SOCKET_PATH: &str = "/run/tether/tetherd.sock";

/// Methods accepted by the daemon.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RpcMethod {
    /// Daemon + lock state summary.
    Status,
    /// Manual admin lock (params: `LockParams`).
    Lock,
    /// Manual admin unlock.
    Unlock,
    /// Rewrite the lock message (params: `LockParams`; only while locked).
    SetMessage,
    /// One-shot location fix upload.
    Locate,
    /// Full data-clear back to the provisioned-unlocked state (debug).
    Reset,
    /// Remote command injected by the platform push bridge
    /// (params: `CommandParams`).
    Command,
    /// Platform event bridge: boot completed broadcast.
    BootCompleted,
    /// Platform event bridge: screen-on / user-present broadcast.
    ScreenOn,
    /// Platform event bridge: push-registration token rotated
    /// (params: `TokenParams`).
    TokenRefresh,
}

/// JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub method: RpcMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
    pub id: String,
}

impl RpcRequest {
    pub fn new(method: RpcMethod, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method,
            params,
            id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

/// JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
    pub id: String,
}

impl RpcResponse {
    pub fn success(id: String, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: String, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(RpcError { code, message }),
            id,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

/// Parameters for `Lock` and `SetMessage`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockParams {
    #[serde(default)]
    pub message: String,
}

/// Parameters for `Command`: a raw push delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandParams {
    pub kind: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Parameters for `TokenRefresh`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenParams {
    pub token: String,
}

/// Status payload returned for `Status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusData {
    pub version: String,
    pub pid: u32,
    pub uptime_secs: u64,
    pub is_locked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked_at: Option<chrono::DateTime<chrono::Utc>>,
    pub device_owner: bool,
    pub device_id: String,
    pub tenant_id: String,
    pub setup_complete: bool,
    pub push_token_registered: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_round_trip() {
        let req = RpcRequest::new(
            RpcMethod::Command,
            Some(serde_json::json!({"kind": "LOCK", "payload": {"message": "overdue"}})),
        );
        let json = serde_json::to_string(&req).unwrap();
        let parsed: RpcRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.method, RpcMethod::Command);
        assert_eq!(parsed.id, req.id);
    }

    #[test]
    fn test_error_response_shape() {
        let resp = RpcResponse::error("1".to_string(), -32602, "Missing params".to_string());
        assert!(!resp.is_success());
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("-32602"));
        assert!(!json.contains("result"));
    }
}
