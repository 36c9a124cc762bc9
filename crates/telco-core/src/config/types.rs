//! Configuration types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Complete configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Plugin-specific configuration sections: [plugins.<name>]
    #[serde(default)]
    pub plugins: HashMap<String, toml::Table>,
}

impl Config {
    /// Get the raw `[plugins.<name>]` table, if present
    pub fn plugin_config(&self, name: &str) -> Option<&toml::Table> {
        self.plugins.get(name)
    }
}
