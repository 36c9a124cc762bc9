//! Bus client trait
//!
//! Mirrors the `connect` / `on(event, handler)` / `disconnect` surface of a
//! typical event bus client. Handler registration is split into
//! [`BusClient::subscribe`] plus a pull-based [`BusClient::next_event`], so the
//! consumer applies events strictly in receive order on a single task.

use super::BusEvent;
use async_trait::async_trait;
use std::time::Duration;

/// Result type for bus operations
pub type Result<T> = std::result::Result<T, BusError>;

/// Bus errors
///
/// All of these are recoverable for the sync plugin. `Decode` skips the one
/// event; the others drop the connection and retry after a backoff delay.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// Could not establish the connection
    #[error("Connection failed: {message}")]
    Connection { message: String },

    /// The established connection broke
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// Operation requires a live connection
    #[error("Not connected")]
    NotConnected,

    /// Event payload did not match the event name
    #[error("Cannot decode '{event}' event: {message}")]
    Decode { event: String, message: String },

    /// Connect attempt exceeded its deadline
    #[error("Connect timed out after {0:?}")]
    Timeout(Duration),
}

/// Client side of the external event bus
///
/// Implementations must be thread-safe (Send + Sync) so the sync plugin can
/// run on any runtime worker.
#[async_trait]
pub trait BusClient: Send + Sync {
    /// Establish a connection to `endpoint`
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Connection`] if the bus cannot be reached
    async fn connect(&mut self, endpoint: &str) -> Result<()>;

    /// Register interest in events named `event` on the current connection
    ///
    /// Subscriptions do not survive a disconnect.
    async fn subscribe(&mut self, event: &str) -> Result<()>;

    /// Wait for the next subscribed event
    ///
    /// Returns `Ok(None)` when the bus closes the stream (bus-reported
    /// disconnect).
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Transport`] when the stream breaks,
    /// [`BusError::Decode`] for a single malformed event (the stream stays
    /// usable), [`BusError::NotConnected`] if called without a connection
    async fn next_event(&mut self) -> Result<Option<BusEvent>>;

    /// Check if the connection is alive
    ///
    /// Does not attempt to reconnect.
    async fn is_connected(&self) -> bool;

    /// Release the connection
    ///
    /// After disconnect, `is_connected()` must return `false`. Calling it
    /// without a live connection is not an error.
    async fn disconnect(&mut self) -> Result<()>;
}
