use std::sync::Arc;
use telco_core::SharedRegistry;
use telco_core::config::Config;

/// Shared services available to plugins during init
#[derive(Clone)]
pub struct PluginContext {
    /// The registry every plugin mutates through its public operations
    pub registry: SharedRegistry,
    /// Application configuration
    pub config: Arc<Config>,
}

impl PluginContext {
    pub fn new(registry: SharedRegistry, config: Arc<Config>) -> Self {
        Self { registry, config }
    }

    /// Get the raw `[plugins.<name>]` table, if present
    pub fn plugin_config(&self, name: &str) -> Option<&toml::Table> {
        self.config.plugin_config(name)
    }
}
