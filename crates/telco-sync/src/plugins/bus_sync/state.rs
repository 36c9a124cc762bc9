use std::fmt;

/// Connection state of the bus sync plugin
///
/// ```text
/// Disconnected ──install──▶ Connecting ──ok──▶ Connected
///                              ▲   │fail           │ closed / transport error
///                              │   ▼               ▼
///                              └─ Backoff ◀── Reconnecting (registry cleared)
/// ```
///
/// `Disconnected` is terminal only after an explicit shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Backoff,
    Reconnecting,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Backoff => "backoff",
            Self::Reconnecting => "reconnecting",
        };
        f.write_str(name)
    }
}
