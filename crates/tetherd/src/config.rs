//! Configuration management for tetherd.
//!
//! Loads settings from /etc/tether/config.toml or uses defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Config file path
pub const CONFIG_PATH: &str = "/etc/tether/config.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Durable state directory.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Control socket path.
    #[serde(default = "default_socket_path")]
    pub socket_path: PathBuf,

    /// Backend API base URL.
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// Duplicate-command suppression window in seconds. Long enough to
    /// absorb a push retry storm, short enough that a deliberate rapid
    /// lock/unlock/lock from the operator is not dropped.
    #[serde(default = "default_dedup_window_secs")]
    pub dedup_window_secs: u64,

    /// Periodic self-heal tick.
    #[serde(default = "default_monitor_interval_secs")]
    pub monitor_interval_secs: u64,

    /// Enterprise policy fetch/apply/report cadence.
    #[serde(default = "default_compliance_interval_secs")]
    pub compliance_interval_secs: u64,

    /// Periodic location upload cadence.
    #[serde(default = "default_location_interval_secs")]
    pub location_interval_secs: u64,

    /// Bounded attempts for backend calls.
    #[serde(default = "default_report_attempts")]
    pub report_attempts: u32,

    /// Base delay for linear backoff between attempts, in seconds.
    #[serde(default = "default_report_backoff_secs")]
    pub report_backoff_secs: u64,

    /// Per-request HTTP timeout.
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Package allowed in the foreground while the device is locked.
    #[serde(default = "default_lock_surface_package")]
    pub lock_surface_package: String,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("/var/lib/tether")
}

fn default_socket_path() -> PathBuf {
    PathBuf::from(tether_common::rpc::SOCKET_PATH)
}

fn default_backend_url() -> String {
    "https://api.tether-mdm.example".to_string()
}

fn default_dedup_window_secs() -> u64 {
    5
}

fn default_monitor_interval_secs() -> u64 {
    60
}

fn default_compliance_interval_secs() -> u64 {
    6 * 3600
}

fn default_location_interval_secs() -> u64 {
    15 * 60
}

fn default_report_attempts() -> u32 {
    3
}

fn default_report_backoff_secs() -> u64 {
    2
}

fn default_http_timeout_secs() -> u64 {
    10
}

fn default_lock_surface_package() -> String {
    "com.tether.agent.locksurface".to_string()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            socket_path: default_socket_path(),
            backend_url: default_backend_url(),
            dedup_window_secs: default_dedup_window_secs(),
            monitor_interval_secs: default_monitor_interval_secs(),
            compliance_interval_secs: default_compliance_interval_secs(),
            location_interval_secs: default_location_interval_secs(),
            report_attempts: default_report_attempts(),
            report_backoff_secs: default_report_backoff_secs(),
            http_timeout_secs: default_http_timeout_secs(),
            lock_surface_package: default_lock_surface_package(),
        }
    }
}

impl AgentConfig {
    /// Load from the standard path, falling back to defaults. A broken
    /// config file must not keep the agent from enforcing lock state, so
    /// parse errors are logged and defaults used.
    pub fn load() -> Self {
        Self::load_from(Path::new(CONFIG_PATH))
    }

    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    warn!("Invalid config at {}: {} - using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                info!("No config at {} - using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Config rooted at a throwaway directory (tests).
    pub fn with_root(root: &Path) -> Self {
        Self {
            data_dir: root.join("state"),
            socket_path: root.join("tetherd.sock"),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let config = AgentConfig::load_from(&temp.path().join("absent.toml"));
        assert_eq!(config.dedup_window_secs, 5);
        assert_eq!(config.report_attempts, 3);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "dedup_window_secs = 10\nbackend_url = \"https://b.example\"\n").unwrap();
        let config = AgentConfig::load_from(&path);
        assert_eq!(config.dedup_window_secs, 10);
        assert_eq!(config.backend_url, "https://b.example");
        assert_eq!(config.monitor_interval_secs, 60);
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "dedup_window_secs = \"not a number\"").unwrap();
        let config = AgentConfig::load_from(&path);
        assert_eq!(config.dedup_window_secs, 5);
    }
}
