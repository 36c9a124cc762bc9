//! Bus sync plugin configuration types

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bus sync plugin configuration (`[plugins.bus_sync]`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusSyncConfig {
    /// Enable bus sync
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Address handed to the bus client on connect
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Upper bound for a single connect attempt
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Reconnect backoff policy
    #[serde(default)]
    pub backoff: BackoffConfig,
}

impl BusSyncConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for BusSyncConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            endpoint: default_endpoint(),
            connect_timeout_ms: default_connect_timeout_ms(),
            backoff: BackoffConfig::default(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_endpoint() -> String {
    "127.0.0.1:27042".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

/// Exponential backoff between reconnect attempts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Delay before the first retry
    #[serde(default = "default_initial_ms")]
    pub initial_ms: u64,

    /// Ceiling for any single delay
    #[serde(default = "default_max_ms")]
    pub max_ms: u64,

    /// Growth factor per attempt
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    /// Proportional jitter: 0.25 means each delay lands in 75%..=125%
    #[serde(default = "default_jitter")]
    pub jitter: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_ms: default_initial_ms(),
            max_ms: default_max_ms(),
            multiplier: default_multiplier(),
            jitter: default_jitter(),
        }
    }
}

fn default_initial_ms() -> u64 {
    500
}

fn default_max_ms() -> u64 {
    30_000
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_jitter() -> f64 {
    0.25
}
