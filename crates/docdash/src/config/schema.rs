use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend endpoints. The dev URL is used when the client runs on a local host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackendConfig {
    #[serde(default = "default_backend_url")]
    pub dev_url: String,
    #[serde(default = "default_backend_url")]
    pub url: String,
    /// Host the client is running on.
    #[serde(default = "default_host")]
    pub host: String,
}

fn default_backend_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_host() -> String {
    "localhost".to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            dev_url: default_backend_url(),
            url: default_backend_url(),
            host: default_host(),
        }
    }
}

impl BackendConfig {
    pub fn is_local_host(&self) -> bool {
        matches!(self.host.trim(), "localhost" | "127.0.0.1")
    }

    /// Base URL for the current host.
    pub fn base_url(&self) -> &str {
        if self.is_local_host() {
            &self.dev_url
        } else {
            &self.url
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PollConfig {
    /// Interval between status checks for in-flight uploads.
    #[serde(default = "default_upload_interval_ms")]
    pub upload_interval_ms: u64,
    /// Interval between status checks for job list rows.
    #[serde(default = "default_job_interval_ms")]
    pub job_interval_ms: u64,
    /// Consecutive failed polls before a warning notification is emitted.
    #[serde(default = "default_failure_warn_threshold")]
    pub failure_warn_threshold: u32,
}

fn default_upload_interval_ms() -> u64 {
    2000
}

fn default_job_interval_ms() -> u64 {
    3000
}

fn default_failure_warn_threshold() -> u32 {
    3
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            upload_interval_ms: default_upload_interval_ms(),
            job_interval_ms: default_job_interval_ms(),
            failure_warn_threshold: default_failure_warn_threshold(),
        }
    }
}

impl PollConfig {
    pub fn upload_interval(&self) -> Duration {
        Duration::from_millis(self.upload_interval_ms)
    }

    pub fn job_interval(&self) -> Duration {
        Duration::from_millis(self.job_interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatConfig {
    /// Number of most recent transcript entries sent as context.
    #[serde(default = "default_history_window")]
    pub history_window: usize,
}

fn default_history_window() -> usize {
    10
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}
