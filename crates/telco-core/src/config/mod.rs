//! Configuration resolution
//!
//! Resolves configuration from multiple sources with priority:
//! 1. Explicit overrides (passed as parameters)
//! 2. Environment variables
//! 3. Explicit config file, or repo-local config (.telco.toml)
//! 4. Global config (~/.config/telco/config.toml)
//! 5. Defaults

mod bus;
mod discovery;
mod types;

pub use bus::{BackoffConfig, BusSyncConfig};
pub use discovery::{load_config_file, resolve_config, ConfigError, ConfigOverrides};
pub use types::Config;
