//! Bus sync plugin configuration parsing and validation

use crate::plugin::PluginError;
use telco_core::config::BusSyncConfig;

/// Bus sync plugin configuration (validated)
#[derive(Debug, Clone)]
pub struct BusSyncPluginConfig {
    /// Core bus sync configuration from telco-core
    pub core: BusSyncConfig,
}

impl BusSyncPluginConfig {
    /// Parse bus sync plugin config from a `[plugins.bus_sync]` TOML table
    ///
    /// # Errors
    ///
    /// Returns error if parsing fails or any value is out of range (see
    /// [`BusSyncPluginConfig::new`]).
    pub fn from_toml(table: &toml::Table) -> Result<Self, PluginError> {
        let core: BusSyncConfig = table
            .clone()
            .try_into()
            .map_err(|e| PluginError::config(format!("Failed to parse bus_sync config: {e}")))?;
        Self::new(core)
    }

    /// Validate an already-built config
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Plugin is enabled with an empty endpoint
    /// - `connect_timeout_ms` or `backoff.initial_ms` is zero
    /// - `backoff.initial_ms` exceeds `backoff.max_ms`
    /// - `backoff.multiplier` is below 1.0
    /// - `backoff.jitter` is outside `0.0..1.0`
    pub fn new(core: BusSyncConfig) -> Result<Self, PluginError> {
        let invalid =
            |message: &str| -> Result<Self, PluginError> { Err(PluginError::config(message)) };

        if core.enabled && core.endpoint.trim().is_empty() {
            return invalid("Bus sync is enabled but no endpoint configured");
        }
        if core.connect_timeout_ms == 0 {
            return invalid("connect_timeout_ms must be greater than zero");
        }

        let backoff = &core.backoff;
        if backoff.initial_ms == 0 {
            return invalid("backoff.initial_ms must be greater than zero");
        }
        if backoff.initial_ms > backoff.max_ms {
            return invalid("backoff.initial_ms must not exceed backoff.max_ms");
        }
        if backoff.multiplier.is_nan() || backoff.multiplier < 1.0 {
            return invalid("backoff.multiplier must be at least 1.0");
        }
        if !(0.0..1.0).contains(&backoff.jitter) {
            return invalid("backoff.jitter must be in 0.0..1.0");
        }

        Ok(Self { core })
    }

    /// Check if bus sync is enabled
    pub fn is_enabled(&self) -> bool {
        self.core.enabled
    }
}
