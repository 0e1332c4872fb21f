//! Client configuration file
//!
//! ```json
//! {
//!   "hosts": ["10.0.0.1:7878", "10.0.0.2:7878"],
//!   "fragment_count": 8,
//!   "connect_timeout_ms": 5000,
//!   "log_level": "info"
//! }
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::errors::{ClientError, ClientResult};
use super::request::FragmentSelector;
use crate::observability::Severity;

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Fragment servers as `host:port`, dialed round-robin (required)
    pub hosts: Vec<String>,

    /// Number of fragments the query is split into (default 1)
    #[serde(default = "default_fragment_count")]
    pub fragment_count: u32,

    /// Run only this fragment; absent runs all of them
    #[serde(default)]
    pub fragment_id: Option<u32>,

    /// Dial timeout per fragment connection (default 10s)
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Pages drained per readiness wake-up (default 16)
    #[serde(default = "default_max_ready_pages")]
    pub max_ready_pages: usize,

    /// Minimum log severity (default "warn")
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_fragment_count() -> u32 {
    1
}
fn default_connect_timeout_ms() -> u64 {
    10_000
}
fn default_max_ready_pages() -> usize {
    16
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            hosts: Vec::new(),
            fragment_count: default_fragment_count(),
            fragment_id: None,
            connect_timeout_ms: default_connect_timeout_ms(),
            max_ready_pages: default_max_ready_pages(),
            log_level: default_log_level(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> ClientResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| ClientError::Config(format!("failed to read config: {}", e)))?;

        let config: ClientConfig = serde_json::from_str(&content)
            .map_err(|e| ClientError::Config(format!("invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> ClientResult<()> {
        if self.hosts.is_empty() {
            return Err(ClientError::Config("hosts must not be empty".into()));
        }
        if let Some(host) = self.hosts.iter().find(|h| h.trim().is_empty()) {
            return Err(ClientError::Config(format!("invalid host '{}'", host)));
        }
        if self.fragment_count == 0 {
            return Err(ClientError::Config("fragment_count must be > 0".into()));
        }
        if let Some(id) = self.fragment_id {
            if id >= self.fragment_count {
                return Err(ClientError::Config(format!(
                    "fragment_id {} must be < fragment_count {}",
                    id, self.fragment_count
                )));
            }
        }
        if self.connect_timeout_ms == 0 {
            return Err(ClientError::Config("connect_timeout_ms must be > 0".into()));
        }
        if self.max_ready_pages == 0 {
            return Err(ClientError::Config("max_ready_pages must be > 0".into()));
        }
        self.severity()?;
        Ok(())
    }

    pub fn severity(&self) -> ClientResult<Severity> {
        Severity::parse(&self.log_level).ok_or_else(|| {
            ClientError::Config(format!(
                "invalid log_level '{}': expected trace, info, warn, error or fatal",
                self.log_level
            ))
        })
    }

    pub fn selector(&self) -> FragmentSelector {
        match self.fragment_id {
            Some(id) => FragmentSelector::Single(id),
            None => FragmentSelector::All,
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}
