//! Mock bus implementation for testing
//!
//! Provides an in-memory event bus driven by a script: tests queue events,
//! stream closures and transport errors, and decide how connect attempts
//! behave, without a real transport.

use super::client::{BusClient, BusError, Result};
use super::BusEvent;
use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{watch, Notify};
use tokio::time::Instant;

/// One scripted item on the mock stream
#[derive(Debug, Clone)]
enum Scripted {
    Event(BusEvent),
    Raw {
        name: String,
        payload: serde_json::Value,
    },
    Close,
    Fail(String),
}

/// In-memory state for mock bus
#[derive(Debug, Default)]
struct MockState {
    connected: bool,
    endpoint: Option<String>,
    subscriptions: HashSet<String>,
    script: VecDeque<Scripted>,

    /// Remaining connect attempts that should fail
    fail_connects: u32,
    /// Fail disconnect calls
    fail_disconnect: bool,

    connect_attempts: Vec<Instant>,
    connect_count: usize,
    disconnect_count: usize,
}

/// Mock bus implementation for testing
///
/// Clones share state, so a test keeps one handle while the plugin owns
/// another. Thread-safe via Arc<Mutex<...>>.
#[derive(Debug, Clone)]
pub struct MockBus {
    state: Arc<Mutex<MockState>>,
    /// Wakes a pending `next_event` when the script grows
    wake: Arc<Notify>,
    /// Connect attempts park here until the gate is open
    connect_gate: Arc<watch::Sender<bool>>,
    /// Subscribe calls park here until the gate is open
    subscribe_gate: Arc<watch::Sender<bool>>,
}

impl MockBus {
    /// Create a new mock bus with connects and subscribes let through
    pub fn new() -> Self {
        let (connect_gate, _) = watch::channel(true);
        let (subscribe_gate, _) = watch::channel(true);
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
            wake: Arc::new(Notify::new()),
            connect_gate: Arc::new(connect_gate),
            subscribe_gate: Arc::new(subscribe_gate),
        }
    }

    /// Queue an event for delivery
    pub fn push_event(&self, event: BusEvent) {
        self.push(Scripted::Event(event));
    }

    /// Queue a raw event, decoded at delivery time
    pub fn push_raw(&self, name: &str, payload: serde_json::Value) {
        self.push(Scripted::Raw {
            name: name.to_string(),
            payload,
        });
    }

    /// Queue a bus-reported disconnect
    pub fn push_close(&self) {
        self.push(Scripted::Close);
    }

    /// Queue a transport failure
    pub fn push_error(&self, message: &str) {
        self.push(Scripted::Fail(message.to_string()));
    }

    /// Make the next `count` connect attempts fail
    pub fn set_fail_connects(&self, count: u32) {
        self.lock().fail_connects = count;
    }

    /// Make disconnect calls fail
    pub fn set_fail_disconnect(&self, fail: bool) {
        self.lock().fail_disconnect = fail;
    }

    /// Hold connect attempts until released with `hold_connects(false)`
    pub fn hold_connects(&self, hold: bool) {
        self.connect_gate.send_replace(!hold);
    }

    /// Hold subscribe calls until released with `hold_subscribes(false)`.
    /// Connects still succeed, so the link is live while subscribe hangs.
    pub fn hold_subscribes(&self, hold: bool) {
        self.subscribe_gate.send_replace(!hold);
    }

    /// Number of successful connects
    pub fn connect_count(&self) -> usize {
        self.lock().connect_count
    }

    /// Time of every connect attempt, successful or not
    pub fn connect_attempts(&self) -> Vec<Instant> {
        self.lock().connect_attempts.clone()
    }

    /// Number of disconnect calls that released a live connection
    pub fn disconnect_count(&self) -> usize {
        self.lock().disconnect_count
    }

    /// Endpoint of the last successful connect
    pub fn endpoint(&self) -> Option<String> {
        self.lock().endpoint.clone()
    }

    /// Event names subscribed on the current connection
    pub fn subscriptions(&self) -> HashSet<String> {
        self.lock().subscriptions.clone()
    }

    /// Whether the mock currently holds a live connection
    pub fn connected(&self) -> bool {
        self.lock().connected
    }

    /// Number of scripted items not yet consumed
    pub fn pending(&self) -> usize {
        self.lock().script.len()
    }

    fn push(&self, item: Scripted) {
        self.lock().script.push_back(item);
        self.wake.notify_one();
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MockBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BusClient for MockBus {
    async fn connect(&mut self, endpoint: &str) -> Result<()> {
        let mut gate = self.connect_gate.subscribe();
        // The sender lives in self, so the channel cannot close here
        let _ = gate.wait_for(|open| *open).await;

        let mut state = self.lock();
        state.connect_attempts.push(Instant::now());

        if state.fail_connects > 0 {
            state.fail_connects -= 1;
            return Err(BusError::Connection {
                message: format!("mock bus at {endpoint} refused connection"),
            });
        }

        state.connected = true;
        state.endpoint = Some(endpoint.to_string());
        state.subscriptions.clear();
        state.connect_count += 1;
        Ok(())
    }

    async fn subscribe(&mut self, event: &str) -> Result<()> {
        let mut gate = self.subscribe_gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;

        let mut state = self.lock();
        if !state.connected {
            return Err(BusError::NotConnected);
        }
        state.subscriptions.insert(event.to_string());
        Ok(())
    }

    async fn next_event(&mut self) -> Result<Option<BusEvent>> {
        loop {
            {
                let mut state = self.lock();
                if !state.connected {
                    return Err(BusError::NotConnected);
                }

                while let Some(item) = state.script.pop_front() {
                    match item {
                        Scripted::Event(event) => {
                            if state.subscriptions.contains(event.name()) {
                                return Ok(Some(event));
                            }
                        }
                        Scripted::Raw { name, payload } => {
                            if state.subscriptions.contains(&name) {
                                return BusEvent::decode(&name, &payload).map(Some);
                            }
                        }
                        Scripted::Close => {
                            state.connected = false;
                            state.subscriptions.clear();
                            return Ok(None);
                        }
                        Scripted::Fail(message) => {
                            return Err(BusError::Transport { message });
                        }
                    }
                }
            }

            self.wake.notified().await;
        }
    }

    async fn is_connected(&self) -> bool {
        self.lock().connected
    }

    async fn disconnect(&mut self) -> Result<()> {
        let mut state = self.lock();
        if state.fail_disconnect {
            return Err(BusError::Transport {
                message: "mock bus disconnect failed".to_string(),
            });
        }
        if state.connected {
            state.connected = false;
            state.subscriptions.clear();
            state.disconnect_count += 1;
        }
        Ok(())
    }
}
