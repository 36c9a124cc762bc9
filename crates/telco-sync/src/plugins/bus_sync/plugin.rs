//! Bus sync plugin implementation

use super::backoff::Backoff;
use super::config::BusSyncPluginConfig;
use super::state::ConnectionState;
use super::translate::apply_event;
use crate::bus::{BusClient, BusError, EVENT_NAMES};
use crate::plugin::{Capability, Plugin, PluginContext, PluginError, PluginMetadata};
use std::time::Duration;
use telco_core::SharedRegistry;
use telco_core::config::BusSyncConfig;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Section name under `[plugins]`
const CONFIG_SECTION: &str = "bus_sync";

/// How a connected session ended
enum SessionEnd {
    /// Shutdown requested
    Cancelled,
    /// The bus closed the event stream
    Closed,
    /// Subscribe or receive failed at the transport level
    Failed(BusError),
}

/// Keeps the process registry in step with an event bus
///
/// Owns the bus connection. Registry changes go through the same
/// [`SharedRegistry`] operations any other caller uses.
pub struct BusSyncPlugin<B: BusClient> {
    bus: B,
    /// Config passed to the constructor; validated in init
    explicit_config: Option<BusSyncConfig>,
    /// Validated configuration (populated during init)
    config: Option<BusSyncPluginConfig>,
    /// Registry handle (populated during init)
    registry: Option<SharedRegistry>,
    state: watch::Sender<ConnectionState>,
    shut_down: bool,
}

impl<B: BusClient> BusSyncPlugin<B> {
    /// Create a plugin that reads `[plugins.bus_sync]` from the host config
    pub fn new(bus: B) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            bus,
            explicit_config: None,
            config: None,
            registry: None,
            state,
            shut_down: false,
        }
    }

    /// Create a plugin with explicit configuration, ignoring the host config
    pub fn with_config(bus: B, config: BusSyncConfig) -> Self {
        Self {
            explicit_config: Some(config),
            ..Self::new(bus)
        }
    }

    /// Watch connection state transitions
    pub fn state_watch(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    fn set_state(&self, next: ConnectionState) {
        let prev = self.state.send_replace(next);
        if prev != next {
            debug!("bus sync: {prev} -> {next}");
        }
    }

    /// Wait for `delay` unless cancelled first. Returns `false` on cancel.
    async fn sleep_or_cancel(delay: Duration, cancel: &CancellationToken) -> bool {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }

    /// Subscribe to process events and apply them until the session ends
    async fn run_session(
        &mut self,
        registry: &SharedRegistry,
        cancel: &CancellationToken,
    ) -> SessionEnd {
        for name in EVENT_NAMES {
            let subscribed = tokio::select! {
                biased;
                _ = cancel.cancelled() => return SessionEnd::Cancelled,
                subscribed = self.bus.subscribe(name) => subscribed,
            };
            if let Err(e) = subscribed {
                return SessionEnd::Failed(e);
            }
        }
        self.set_state(ConnectionState::Connected);

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return SessionEnd::Cancelled,
                next = self.bus.next_event() => next,
            };

            match next {
                Ok(Some(event)) => {
                    let name = event.name();
                    let applied = apply_event(registry, event);
                    debug!("bus event {name}: {applied:?}");
                }
                Ok(None) => return SessionEnd::Closed,
                // One malformed message does not invalidate the session
                Err(BusError::Decode { event, message }) => {
                    warn!("bus sync: skipping undecodable {event} event: {message}");
                }
                Err(e) => return SessionEnd::Failed(e),
            }
        }
    }

    /// Release the bus connection. Failures are logged; the connection is
    /// considered gone either way.
    async fn release(&mut self) {
        if let Err(e) = self.bus.disconnect().await {
            warn!("bus sync: disconnect failed: {e}");
        }
    }
}

impl<B: BusClient> Plugin for BusSyncPlugin<B> {
    fn metadata(&self) -> PluginMetadata {
        PluginMetadata {
            name: "bus_sync",
            version: "0.1.0",
            description: "Mirrors process lifecycle events from the bus into the registry",
            capabilities: vec![Capability::BusSync],
        }
    }

    async fn init(&mut self, ctx: &PluginContext) -> Result<(), PluginError> {
        let config = match self.explicit_config.take() {
            Some(core) => BusSyncPluginConfig::new(core)?,
            None => match ctx.plugin_config(CONFIG_SECTION) {
                Some(table) => BusSyncPluginConfig::from_toml(table)?,
                None => BusSyncPluginConfig::new(BusSyncConfig::default())?,
            },
        };

        if config.is_enabled() {
            info!(
                "Bus sync plugin initialized: endpoint={}, backoff={}..{}ms",
                config.core.endpoint, config.core.backoff.initial_ms, config.core.backoff.max_ms
            );
        } else {
            info!("Bus sync plugin disabled in config");
        }

        self.registry = Some(ctx.registry.clone());
        self.config = Some(config);
        Ok(())
    }

    async fn run(&mut self, cancel: CancellationToken) -> Result<(), PluginError> {
        if self.shut_down {
            return Err(PluginError::runtime("Plugin already shut down"));
        }
        let (config, registry) = match (&self.config, &self.registry) {
            (Some(config), Some(registry)) => (config.core.clone(), registry.clone()),
            _ => {
                return Err(PluginError::runtime("Plugin not initialized"));
            }
        };

        // If disabled, just wait for cancellation
        if !config.enabled {
            cancel.cancelled().await;
            return Ok(());
        }

        let mut backoff = Backoff::new(&config.backoff);
        let connect_timeout = config.connect_timeout();

        loop {
            self.set_state(ConnectionState::Connecting);

            let attempt = tokio::time::timeout(connect_timeout, self.bus.connect(&config.endpoint));
            let connected = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                result = attempt => Some(result.unwrap_or(Err(BusError::Timeout(connect_timeout)))),
            };

            match connected {
                None => {
                    // A connect abandoned mid-flight may have left a live link
                    if self.bus.is_connected().await {
                        self.release().await;
                    }
                    break;
                }
                Some(Err(e)) => {
                    let delay = backoff.next_delay();
                    warn!(
                        "bus sync: connect to {} failed (attempt {}): {e}; retrying in {delay:?}",
                        config.endpoint,
                        backoff.attempt()
                    );
                    self.set_state(ConnectionState::Backoff);
                    if !Self::sleep_or_cancel(delay, &cancel).await {
                        break;
                    }
                    continue;
                }
                Some(Ok(())) => {}
            }

            info!("bus sync: connected to {}", config.endpoint);
            backoff.reset();

            let end = self.run_session(&registry, &cancel).await;
            self.release().await;

            match end {
                SessionEnd::Cancelled => break,
                SessionEnd::Closed => info!("bus sync: bus closed the connection"),
                SessionEnd::Failed(e) => warn!("bus sync: connection lost: {e}"),
            }

            // Entries may describe processes that changed while we were away
            registry.clear();
            self.set_state(ConnectionState::Reconnecting);

            let delay = backoff.next_delay();
            debug!("bus sync: reconnecting in {delay:?}");
            if !Self::sleep_or_cancel(delay, &cancel).await {
                break;
            }
        }

        self.set_state(ConnectionState::Disconnected);
        info!("bus sync: stopped");
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), PluginError> {
        if self.shut_down {
            return Err(PluginError::shutdown("bus sync plugin already shut down"));
        }
        self.shut_down = true;

        let result = if self.bus.is_connected().await {
            self.bus
                .disconnect()
                .await
                .map_err(|e| PluginError::Shutdown {
                    message: "failed to release bus connection".to_string(),
                    source: Some(Box::new(e)),
                })
        } else {
            Ok(())
        };

        self.set_state(ConnectionState::Disconnected);
        if let Some(config) = &self.config
            && config.is_enabled()
        {
            info!("Bus sync plugin shut down");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{BusEvent, MockBus};
    use std::sync::Arc;
    use telco_core::Process;
    use telco_core::config::{BackoffConfig, Config};

    fn create_test_context(config: Config) -> PluginContext {
        PluginContext::new(SharedRegistry::new(), Arc::new(config))
    }

    fn fast_config() -> BusSyncConfig {
        BusSyncConfig {
            endpoint: "mock:1".to_string(),
            backoff: BackoffConfig {
                initial_ms: 100,
                max_ms: 800,
                multiplier: 2.0,
                jitter: 0.0,
            },
            ..Default::default()
        }
    }

    async fn wait_for_state(rx: &mut watch::Receiver<ConnectionState>, want: ConnectionState) {
        rx.wait_for(|s| *s == want).await.unwrap();
    }

    #[test]
    fn test_plugin_metadata() {
        let plugin = BusSyncPlugin::new(MockBus::new());
        let metadata = plugin.metadata();

        assert_eq!(metadata.name, "bus_sync");
        assert!(metadata.capabilities.contains(&Capability::BusSync));
        assert_eq!(plugin.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_plugin_init_reads_host_config() {
        let mut plugin = BusSyncPlugin::new(MockBus::new());

        let toml_str = r#"
[plugins.bus_sync]
endpoint = "from-host:7"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        plugin.init(&create_test_context(config)).await.unwrap();

        let cfg = plugin.config.as_ref().unwrap();
        assert_eq!(cfg.core.endpoint, "from-host:7");
        assert!(plugin.registry.is_some());
    }

    #[tokio::test]
    async fn test_plugin_init_explicit_config_wins() {
        let mut plugin = BusSyncPlugin::with_config(MockBus::new(), fast_config());

        let config: Config =
            toml::from_str("[plugins.bus_sync]\nendpoint = \"ignored:1\"").unwrap();
        plugin.init(&create_test_context(config)).await.unwrap();

        assert_eq!(plugin.config.as_ref().unwrap().core.endpoint, "mock:1");
    }

    #[tokio::test]
    async fn test_plugin_init_rejects_invalid_config() {
        let mut plugin = BusSyncPlugin::new(MockBus::new());
        let config: Config =
            toml::from_str("[plugins.bus_sync]\n[plugins.bus_sync.backoff]\njitter = 2.0").unwrap();

        let err = plugin.init(&create_test_context(config)).await.unwrap_err();
        assert!(matches!(err, PluginError::Config { .. }));
    }

    #[tokio::test]
    async fn test_plugin_run_without_init_errors() {
        let mut plugin = BusSyncPlugin::new(MockBus::new());
        let err = plugin.run(CancellationToken::new()).await.unwrap_err();
        assert!(err.to_string().contains("not initialized"));
    }

    #[tokio::test]
    async fn test_plugin_run_disabled_waits_for_cancel() {
        let bus = MockBus::new();
        let mut plugin = BusSyncPlugin::new(bus.clone());
        let config: Config = toml::from_str("[plugins.bus_sync]\nenabled = false").unwrap();
        plugin.init(&create_test_context(config)).await.unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        plugin.run(cancel).await.unwrap();

        assert!(bus.connect_attempts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_plugin_applies_events_then_stops_on_cancel() {
        let bus = MockBus::new();
        bus.push_event(BusEvent::ProcessStarted { id: 1, label: "A".to_string() });
        bus.push_event(BusEvent::ProcessStarted { id: 2, label: "B".to_string() });
        bus.push_event(BusEvent::ProcessStopped { id: 1 });

        let ctx = create_test_context(Config::default());
        let registry = ctx.registry.clone();
        let mut plugin = BusSyncPlugin::with_config(bus.clone(), fast_config());
        plugin.init(&ctx).await.unwrap();

        let cancel = CancellationToken::new();
        let run_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            let result = plugin.run(run_cancel).await;
            (plugin, result)
        });

        let mut rx = registry.subscribe();
        rx.wait_for(|rev| *rev >= 3).await.unwrap();
        assert_eq!(registry.list_processes(), vec![Process::new(2, "B")]);

        cancel.cancel();
        let (mut plugin, result) = handle.await.unwrap();
        result.unwrap();

        assert_eq!(plugin.state(), ConnectionState::Disconnected);
        assert_eq!(bus.disconnect_count(), 1);
        assert!(!bus.connected());
        assert_eq!(bus.endpoint().as_deref(), Some("mock:1"));

        plugin.shutdown().await.unwrap();
        let err = plugin.shutdown().await.unwrap_err();
        assert!(err.to_string().contains("already shut down"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_timeout_moves_to_backoff() {
        let bus = MockBus::new();
        bus.hold_connects(true);

        let ctx = create_test_context(Config::default());
        let config = BusSyncConfig {
            connect_timeout_ms: 50,
            ..fast_config()
        };
        let mut plugin = BusSyncPlugin::with_config(bus.clone(), config);
        plugin.init(&ctx).await.unwrap();
        let mut state = plugin.state_watch();

        let cancel = CancellationToken::new();
        let run_cancel = cancel.clone();
        let handle = tokio::spawn(async move { plugin.run(run_cancel).await });

        wait_for_state(&mut state, ConnectionState::Backoff).await;
        assert_eq!(bus.connect_count(), 0);

        bus.hold_connects(false);
        wait_for_state(&mut state, ConnectionState::Connected).await;
        assert_eq!(bus.connect_count(), 1);

        cancel.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_reports_disconnect_failure() {
        let bus = MockBus::new();
        let mut plugin = BusSyncPlugin::with_config(bus.clone(), fast_config());
        plugin.init(&create_test_context(Config::default())).await.unwrap();

        // Leave a live connection behind, as an aborted run would
        let mut raw = bus.clone();
        raw.connect("mock:1").await.unwrap();
        bus.set_fail_disconnect(true);

        let err = plugin.shutdown().await.unwrap_err();
        assert!(matches!(err, PluginError::Shutdown { .. }));
        assert_eq!(plugin.state(), ConnectionState::Disconnected);
    }
}
