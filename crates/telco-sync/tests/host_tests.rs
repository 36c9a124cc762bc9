use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use telco_core::config::Config;
use telco_core::{Process, SharedRegistry};
use telco_sync::host::{Host, HostError};
use telco_sync::plugin::{
    Capability, Plugin, PluginContext, PluginError, PluginMetadata, PluginState,
};
use tokio_util::sync::CancellationToken;

// ============================================================================
// Mock/Test Plugins
// ============================================================================

/// Counts lifecycle calls and waits for cancellation in run()
struct MockPlugin {
    name: &'static str,
    shutdowns: Arc<AtomicUsize>,
    fail_init: bool,
    fail_run: bool,
    /// run() ignores cancellation and never returns
    hang_run: bool,
    fail_shutdown: bool,
}

impl MockPlugin {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            shutdowns: Arc::new(AtomicUsize::new(0)),
            fail_init: false,
            fail_run: false,
            hang_run: false,
            fail_shutdown: false,
        }
    }
}

impl Plugin for MockPlugin {
    fn metadata(&self) -> PluginMetadata {
        PluginMetadata {
            name: self.name,
            version: "1.0.0",
            description: "Mock plugin for testing",
            capabilities: vec![Capability::Custom("mock".to_string())],
        }
    }

    async fn init(&mut self, _ctx: &PluginContext) -> Result<(), PluginError> {
        if self.fail_init {
            return Err(PluginError::init("mock init failure"));
        }
        Ok(())
    }

    async fn run(&mut self, cancel: CancellationToken) -> Result<(), PluginError> {
        if self.fail_run {
            return Err(PluginError::runtime("mock run failure"));
        }
        if self.hang_run {
            std::future::pending::<()>().await;
        }
        cancel.cancelled().await;
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), PluginError> {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        if self.fail_shutdown {
            return Err(PluginError::shutdown("resource already released"));
        }
        Ok(())
    }
}

/// Writes to the registry through the handle it receives in init()
struct WriterPlugin {
    registry: Option<SharedRegistry>,
}

impl Plugin for WriterPlugin {
    fn metadata(&self) -> PluginMetadata {
        PluginMetadata {
            name: "writer",
            version: "1.0.0",
            description: "Adds one process on run",
            capabilities: vec![],
        }
    }

    async fn init(&mut self, ctx: &PluginContext) -> Result<(), PluginError> {
        self.registry = Some(ctx.registry.clone());
        Ok(())
    }

    async fn run(&mut self, cancel: CancellationToken) -> Result<(), PluginError> {
        if let Some(registry) = &self.registry {
            registry
                .add_process(77, "written-by-plugin")
                .map_err(|e| PluginError::Runtime {
                    message: e.to_string(),
                    source: Some(Box::new(e)),
                })?;
        }
        cancel.cancelled().await;
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), PluginError> {
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_new_host_is_empty() {
    let host = Host::new(Config::default());
    assert!(host.is_empty());
    assert!(host.registry().is_empty());
    assert!(host.state_of("anything").is_none());
}

#[tokio::test]
async fn test_install_and_shutdown_lifecycle() {
    let mut host = Host::new(Config::default());
    let plugin = MockPlugin::new("mock");
    let shutdowns = Arc::clone(&plugin.shutdowns);

    host.install_plugin(plugin).await.unwrap();
    assert_eq!(host.len(), 1);
    assert!(matches!(
        host.state_of("mock"),
        Some(PluginState::Initialized | PluginState::Running)
    ));

    host.shutdown(Duration::from_secs(1)).await.unwrap();
    assert_eq!(host.state_of("mock"), Some(PluginState::Stopped));
    assert_eq!(shutdowns.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failed_init_is_not_installed() {
    let mut host = Host::new(Config::default());
    let mut plugin = MockPlugin::new("broken");
    plugin.fail_init = true;

    let err = host.install_plugin(plugin).await.unwrap_err();
    match err {
        HostError::Init { name, .. } => assert_eq!(name, "broken"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(host.is_empty());
}

#[tokio::test]
async fn test_failed_run_marks_plugin_failed() {
    let mut host = Host::new(Config::default());
    let mut plugin = MockPlugin::new("crashy");
    plugin.fail_run = true;

    host.install_plugin(plugin).await.unwrap();
    tokio::task::yield_now().await;

    host.shutdown(Duration::from_secs(1)).await.unwrap();
    assert_eq!(host.state_of("crashy"), Some(PluginState::Failed));
}

#[tokio::test]
async fn test_shutdown_failure_is_reported_for_each_plugin() {
    let mut host = Host::new(Config::default());
    let mut bad = MockPlugin::new("bad");
    bad.fail_shutdown = true;
    let good = MockPlugin::new("good");
    let good_shutdowns = Arc::clone(&good.shutdowns);

    host.install_plugin(bad).await.unwrap();
    host.install_plugin(good).await.unwrap();

    let err = host.shutdown(Duration::from_secs(1)).await.unwrap_err();
    match &err {
        HostError::Shutdown { failures } => {
            assert_eq!(failures.len(), 1);
            assert!(failures[0].starts_with("bad:"));
            assert!(failures[0].contains("resource already released"));
        }
        other => panic!("unexpected error: {other}"),
    }

    // The failure did not stop the remaining plugin from shutting down
    assert_eq!(good_shutdowns.load(Ordering::SeqCst), 1);
    assert_eq!(host.state_of("bad"), Some(PluginState::Failed));
    assert_eq!(host.state_of("good"), Some(PluginState::Stopped));
}

#[tokio::test(start_paused = true)]
async fn test_overrunning_run_is_aborted_and_still_shut_down() {
    let mut host = Host::new(Config::default());
    let mut plugin = MockPlugin::new("stubborn");
    plugin.hang_run = true;
    let shutdowns = Arc::clone(&plugin.shutdowns);

    host.install_plugin(plugin).await.unwrap();
    tokio::task::yield_now().await;

    let err = host.shutdown(Duration::from_millis(100)).await.unwrap_err();
    match &err {
        HostError::Shutdown { failures } => {
            assert_eq!(failures, &vec!["stubborn: run did not stop in time".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }

    // The aborted run released its lock, so shutdown() was reached
    assert_eq!(shutdowns.load(Ordering::SeqCst), 1);
    assert_eq!(host.state_of("stubborn"), Some(PluginState::Failed));
}

#[tokio::test]
async fn test_second_shutdown_is_reported() {
    let mut host = Host::new(Config::default());
    host.install_plugin(MockPlugin::new("mock")).await.unwrap();

    host.shutdown(Duration::from_secs(1)).await.unwrap();
    assert!(matches!(
        host.shutdown(Duration::from_secs(1)).await,
        Err(HostError::AlreadyShutDown)
    ));
    assert!(matches!(
        host.install_plugin(MockPlugin::new("late")).await,
        Err(HostError::AlreadyShutDown)
    ));
}

#[tokio::test]
async fn test_plugins_share_the_host_registry() {
    let mut host = Host::new(Config::default());
    let registry = host.registry();
    let mut changes = registry.subscribe();

    host.install_plugin(WriterPlugin { registry: None })
        .await
        .unwrap();

    changes.changed().await.unwrap();
    assert_eq!(
        registry.list_processes(),
        vec![Process::new(77, "written-by-plugin")]
    );

    host.shutdown(Duration::from_secs(1)).await.unwrap();
}
