//! Bus sync plugin: mirrors external bus events into the process registry

mod backoff;
mod config;
mod plugin;
mod state;
mod translate;

pub use backoff::Backoff;
pub use config::BusSyncPluginConfig;
pub use plugin::BusSyncPlugin;
pub use state::ConnectionState;
pub use translate::{apply_event, Applied};
