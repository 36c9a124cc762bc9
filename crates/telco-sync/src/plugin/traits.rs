use super::{PluginContext, PluginError, PluginMetadata};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Boxed lifecycle future returned by [`ErasedPlugin`]
pub type PluginFuture<'a> = Pin<Box<dyn Future<Output = Result<(), PluginError>> + Send + 'a>>;

/// A component installed into a [`crate::host::Host`]
///
/// The host calls `init` once on install, drives `run` in a task of its own
/// until the token is cancelled, then calls `shutdown`.
pub trait Plugin: Send + Sync {
    fn metadata(&self) -> PluginMetadata;

    /// Capture the registry handle and validate configuration
    fn init(
        &mut self,
        ctx: &PluginContext,
    ) -> impl Future<Output = Result<(), PluginError>> + Send;

    /// Work until `cancel` fires. Returning early is allowed.
    fn run(
        &mut self,
        cancel: CancellationToken,
    ) -> impl Future<Output = Result<(), PluginError>> + Send;

    /// Release external resources. Called after `run` has returned.
    fn shutdown(&mut self) -> impl Future<Output = Result<(), PluginError>> + Send;
}

/// Dyn-compatible mirror of [`Plugin`], so the host can store mixed plugins.
///
/// Every `Plugin` gets this through the blanket impl below.
pub trait ErasedPlugin: Send + Sync {
    fn metadata(&self) -> PluginMetadata;
    fn init<'a>(&'a mut self, ctx: &'a PluginContext) -> PluginFuture<'a>;
    fn run(&mut self, cancel: CancellationToken) -> PluginFuture<'_>;
    fn shutdown(&mut self) -> PluginFuture<'_>;
}

impl<T: Plugin> ErasedPlugin for T {
    fn metadata(&self) -> PluginMetadata {
        Plugin::metadata(self)
    }

    fn init<'a>(&'a mut self, ctx: &'a PluginContext) -> PluginFuture<'a> {
        Box::pin(Plugin::init(self, ctx))
    }

    fn run(&mut self, cancel: CancellationToken) -> PluginFuture<'_> {
        Box::pin(Plugin::run(self, cancel))
    }

    fn shutdown(&mut self) -> PluginFuture<'_> {
        Box::pin(Plugin::shutdown(self))
    }
}

/// Installed plugin, shared between its run task and the host's shutdown path
pub type SharedPlugin = Arc<tokio::sync::Mutex<Box<dyn ErasedPlugin>>>;
