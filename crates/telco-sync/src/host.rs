//! Host runtime: owns the registry and the plugins installed against it
//!
//! The host:
//! 1. Constructs the process registry
//! 2. Initializes each plugin on install and spawns its run() in its own task
//! 3. On shutdown, cancels every plugin, joins its task and calls shutdown()
//!    with a timeout
//!
//! Dropping a host without calling [`Host::shutdown`] still cancels the
//! plugin tasks, so they release their connections.

use crate::plugin::{
    ErasedPlugin, Plugin, PluginContext, PluginError, PluginMetadata, PluginState, SharedPlugin,
};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use telco_core::SharedRegistry;
use telco_core::config::Config;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Host errors
#[derive(Debug, Error)]
pub enum HostError {
    /// A plugin failed to initialize and was not installed
    #[error("failed to install plugin {name}: {source}")]
    Init {
        name: &'static str,
        #[source]
        source: PluginError,
    },

    /// One or more plugins did not shut down cleanly
    #[error("{} plugin(s) failed to shut down cleanly: {}", .failures.len(), .failures.join("; "))]
    Shutdown { failures: Vec<String> },

    /// The host was already shut down
    #[error("host already shut down")]
    AlreadyShutDown,
}

/// Entry tracking an installed plugin, its run task and its state
struct InstalledPlugin {
    metadata: PluginMetadata,
    plugin: SharedPlugin,
    task: Option<JoinHandle<()>>,
    state: Arc<Mutex<PluginState>>,
}

/// Owns one process registry and the plugins that feed it
pub struct Host {
    ctx: PluginContext,
    cancel: CancellationToken,
    plugins: Vec<InstalledPlugin>,
    shut_down: bool,
}

impl Host {
    /// Create a host with a new, empty registry
    pub fn new(config: Config) -> Self {
        Self {
            ctx: PluginContext::new(SharedRegistry::new(), Arc::new(config)),
            cancel: CancellationToken::new(),
            plugins: Vec::new(),
            shut_down: false,
        }
    }

    /// Handle to the registry, for readers and additional writers
    pub fn registry(&self) -> SharedRegistry {
        self.ctx.registry.clone()
    }

    /// Initialize `plugin` against this host's registry and start running it
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Init`] if the plugin's init() fails, or
    /// [`HostError::AlreadyShutDown`] after [`Host::shutdown`].
    pub async fn install_plugin<P: Plugin + 'static>(
        &mut self,
        plugin: P,
    ) -> Result<(), HostError> {
        if self.shut_down {
            return Err(HostError::AlreadyShutDown);
        }

        let mut plugin: Box<dyn ErasedPlugin> = Box::new(plugin);
        let metadata = plugin.metadata();
        plugin
            .init(&self.ctx)
            .await
            .map_err(|source| HostError::Init {
                name: metadata.name,
                source,
            })?;
        info!("Installed plugin {} v{}", metadata.name, metadata.version);

        let state = Arc::new(Mutex::new(PluginState::Initialized));
        let plugin: SharedPlugin = Arc::new(tokio::sync::Mutex::new(plugin));

        let task = {
            let plugin = Arc::clone(&plugin);
            let state = Arc::clone(&state);
            let cancel = self.cancel.child_token();
            let plugin_name = metadata.name;

            tokio::spawn(async move {
                info!("Plugin {} run() starting", plugin_name);
                set_state(&state, PluginState::Running);
                let mut plugin = plugin.lock().await;

                match plugin.run(cancel).await {
                    Ok(()) => {
                        info!("Plugin {} run() completed", plugin_name);
                        set_state(&state, PluginState::Stopped);
                    }
                    Err(e) => {
                        error!("Plugin {} run() failed: {}", plugin_name, e);
                        set_state(&state, PluginState::Failed);
                    }
                }
            })
        };

        self.plugins.push(InstalledPlugin {
            metadata,
            plugin,
            task: Some(task),
            state,
        });
        Ok(())
    }

    /// Number of installed plugins
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Get the state of a plugin by name
    pub fn state_of(&self, name: &str) -> Option<PluginState> {
        self.plugins
            .iter()
            .find(|p| p.metadata.name == name)
            .map(|p| current_state(&p.state))
    }

    /// Stop every plugin and release its resources.
    ///
    /// Each plugin gets `shutdown_timeout` to finish its run task and again to
    /// complete shutdown(). A run task that overruns is aborted, and shutdown()
    /// is still called so the plugin can release what the run left open.
    /// Failures are collected rather than retried.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Shutdown`] listing every plugin that failed or
    /// timed out, or [`HostError::AlreadyShutDown`] on a second call.
    pub async fn shutdown(&mut self, shutdown_timeout: Duration) -> Result<(), HostError> {
        if self.shut_down {
            return Err(HostError::AlreadyShutDown);
        }
        self.shut_down = true;

        info!(
            "Beginning shutdown of {} plugin(s) (timeout: {:?})",
            self.plugins.len(),
            shutdown_timeout
        );
        self.cancel.cancel();

        let mut failures = Vec::new();

        for entry in &mut self.plugins {
            let plugin_name = entry.metadata.name;

            if let Some(mut task) = entry.task.take() {
                match timeout(shutdown_timeout, &mut task).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        error!("Plugin {} task panicked: {}", plugin_name, e);
                        set_state(&entry.state, PluginState::Failed);
                    }
                    Err(_) => {
                        warn!(
                            "Plugin {} did not stop within {:?}, aborting",
                            plugin_name, shutdown_timeout
                        );
                        task.abort();
                        // Wait for the aborted run to drop its plugin lock
                        let _ = task.await;
                        set_state(&entry.state, PluginState::Failed);
                        failures.push(format!("{plugin_name}: run did not stop in time"));
                    }
                }
            }

            let mut plugin = entry.plugin.lock().await;
            match timeout(shutdown_timeout, plugin.shutdown()).await {
                Ok(Ok(())) => {
                    info!("Plugin {} shut down cleanly", plugin_name);
                    if current_state(&entry.state) != PluginState::Failed {
                        set_state(&entry.state, PluginState::Stopped);
                    }
                }
                Ok(Err(e)) => {
                    error!("Plugin {} shutdown failed: {}", plugin_name, e);
                    set_state(&entry.state, PluginState::Failed);
                    failures.push(format!("{plugin_name}: {e}"));
                }
                Err(_) => {
                    warn!(
                        "Plugin {} shutdown timed out after {:?}",
                        plugin_name, shutdown_timeout
                    );
                    failures.push(format!("{plugin_name}: shutdown timed out"));
                }
            }
        }

        info!(
            "Shutdown complete: {} plugin(s), {} failure(s)",
            self.plugins.len(),
            failures.len()
        );

        if failures.is_empty() {
            Ok(())
        } else {
            Err(HostError::Shutdown { failures })
        }
    }
}

impl Drop for Host {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn set_state(state: &Mutex<PluginState>, next: PluginState) {
    *state.lock().unwrap_or_else(PoisonError::into_inner) = next;
}

fn current_state(state: &Mutex<PluginState>) -> PluginState {
    *state.lock().unwrap_or_else(PoisonError::into_inner)
}
