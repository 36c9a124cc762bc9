//! Configuration discovery and resolution

use super::types::Config;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Name of the bus sync plugin section under `[plugins]`
const BUS_SYNC_SECTION: &str = "bus_sync";

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Caller-supplied overrides for configuration
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    /// Path to config file override (replaces repo-local discovery)
    pub config_path: Option<PathBuf>,
    /// Override the bus endpoint
    pub bus_endpoint: Option<String>,
}

/// Resolve configuration from all sources
///
/// Priority (highest to lowest):
/// 1. Explicit overrides
/// 2. Environment variables (`TELCO_BUS_ENDPOINT`)
/// 3. Explicit config file, or repo-local config (.telco.toml in current dir or up to git root)
/// 4. Global config (~/.config/telco/config.toml)
/// 5. Defaults
///
/// # Errors
///
/// Discovered files that fail to parse are logged and skipped. An explicit
/// `config_path` that cannot be read or parsed is returned as an error.
pub fn resolve_config(
    overrides: &ConfigOverrides,
    current_dir: &Path,
    home_dir: &Path,
) -> Result<Config, ConfigError> {
    let mut config = Config::default();

    // 4. Try global config
    let global_config_path = home_dir.join(".config/telco/config.toml");
    if global_config_path.exists() {
        match load_config_file(&global_config_path) {
            Ok(file_config) => merge_config(&mut config, file_config),
            Err(e) => warn!("Failed to parse global config at {global_config_path:?}: {e}"),
        }
    }

    // 3. Explicit file wins over repo-local discovery
    if let Some(path) = &overrides.config_path {
        let file_config = load_config_file(path)?;
        debug!("Loaded config from {path:?}");
        merge_config(&mut config, file_config);
    } else if let Some(repo_config) = find_repo_local_config(current_dir) {
        match load_config_file(&repo_config) {
            Ok(file_config) => merge_config(&mut config, file_config),
            Err(e) => warn!("Failed to parse repo config at {repo_config:?}: {e}"),
        }
    }

    // 2. Apply environment variables
    apply_env_overrides(&mut config);

    // 1. Apply explicit overrides
    apply_overrides(&mut config, overrides);

    Ok(config)
}

/// Find repo-local config file
///
/// Searches current directory and parent directories up to git root
fn find_repo_local_config(current_dir: &Path) -> Option<PathBuf> {
    let mut dir = current_dir;

    loop {
        let config_path = dir.join(".telco.toml");
        if config_path.exists() {
            return Some(config_path);
        }

        // Stop at git root
        if dir.join(".git").exists() {
            break;
        }

        dir = dir.parent()?;
    }

    None
}

/// Load config from a TOML file
pub fn load_config_file(path: &Path) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)?;
    Ok(config)
}

/// Merge file config into base config
///
/// Plugin sections are merged key by key, so a repo-local file can override a
/// single setting from the global file.
fn merge_config(base: &mut Config, file: Config) {
    for (name, table) in file.plugins {
        let section = base.plugins.entry(name).or_default();
        for (key, value) in table {
            section.insert(key, value);
        }
    }
}

fn apply_env_overrides(config: &mut Config) {
    if let Ok(endpoint) = std::env::var("TELCO_BUS_ENDPOINT")
        && !endpoint.trim().is_empty()
    {
        set_bus_endpoint(config, endpoint);
    }
}

fn apply_overrides(config: &mut Config, overrides: &ConfigOverrides) {
    if let Some(ref endpoint) = overrides.bus_endpoint {
        set_bus_endpoint(config, endpoint.clone());
    }
}

fn set_bus_endpoint(config: &mut Config, endpoint: String) {
    config
        .plugins
        .entry(BUS_SYNC_SECTION.to_string())
        .or_default()
        .insert("endpoint".to_string(), toml::Value::String(endpoint));
}
