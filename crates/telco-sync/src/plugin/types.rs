use serde::{Deserialize, Serialize};
use std::fmt;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Plugin identity and capabilities
#[derive(Debug, Clone)]
pub struct PluginMetadata {
    pub name: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub capabilities: Vec<Capability>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    /// Mirrors an external event bus into the registry
    BusSync,
    Custom(String),
}

/// Where a plugin is in its host-managed lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginState {
    /// init() succeeded, run() not yet started
    Initialized,
    Running,
    /// run() returned and shutdown() (if reached) succeeded
    Stopped,
    /// run() or shutdown() returned an error, or the task panicked
    Failed,
}

impl fmt::Display for PluginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PluginState::Initialized => "initialized",
            PluginState::Running => "running",
            PluginState::Stopped => "stopped",
            PluginState::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("plugin init failed: {message}")]
    Init {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("plugin runtime error: {message}")]
    Runtime {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("plugin shutdown failed: {message}")]
    Shutdown {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Configuration was present but invalid
    #[error("plugin config error: {message}")]
    Config { message: String },
}

impl PluginError {
    pub fn init(message: impl Into<String>) -> Self {
        Self::Init {
            message: message.into(),
            source: None,
        }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime {
            message: message.into(),
            source: None,
        }
    }

    pub fn shutdown(message: impl Into<String>) -> Self {
        Self::Shutdown {
            message: message.into(),
            source: None,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
