pub mod context;
pub mod traits;
pub mod types;

pub use context::PluginContext;
pub use traits::{ErasedPlugin, Plugin, PluginFuture, SharedPlugin};
pub use types::{Capability, PluginError, PluginMetadata, PluginState};
