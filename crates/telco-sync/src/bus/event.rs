use super::BusError;
use serde::Deserialize;
use telco_core::ProcessId;

pub const PROCESS_STARTED: &str = "process-started";
pub const PROCESS_STOPPED: &str = "process-stopped";
pub const PROCESS_RENAMED: &str = "process-renamed";

/// Every event name the sync plugin subscribes to
pub const EVENT_NAMES: [&str; 3] = [PROCESS_STARTED, PROCESS_STOPPED, PROCESS_RENAMED];

/// Process lifecycle event reported by the bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    ProcessStarted { id: ProcessId, label: String },
    ProcessStopped { id: ProcessId },
    ProcessRenamed { id: ProcessId, label: String },
}

#[derive(Deserialize)]
struct LabeledPayload {
    id: ProcessId,
    label: String,
}

#[derive(Deserialize)]
struct IdPayload {
    id: ProcessId,
}

impl BusEvent {
    /// Decode an event from its bus name and JSON payload
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Decode`] for unknown names or payloads missing
    /// `id`/`label`.
    pub fn decode(name: &str, payload: &serde_json::Value) -> Result<Self, BusError> {
        let decode_err = |e: serde_json::Error| BusError::Decode {
            event: name.to_string(),
            message: e.to_string(),
        };

        match name {
            PROCESS_STARTED => {
                let p = LabeledPayload::deserialize(payload).map_err(decode_err)?;
                Ok(Self::ProcessStarted { id: p.id, label: p.label })
            }
            PROCESS_STOPPED => {
                let p = IdPayload::deserialize(payload).map_err(decode_err)?;
                Ok(Self::ProcessStopped { id: p.id })
            }
            PROCESS_RENAMED => {
                let p = LabeledPayload::deserialize(payload).map_err(decode_err)?;
                Ok(Self::ProcessRenamed { id: p.id, label: p.label })
            }
            other => Err(BusError::Decode {
                event: other.to_string(),
                message: "unknown event".to_string(),
            }),
        }
    }

    /// Bus name of this event
    pub fn name(&self) -> &'static str {
        match self {
            Self::ProcessStarted { .. } => PROCESS_STARTED,
            Self::ProcessStopped { .. } => PROCESS_STOPPED,
            Self::ProcessRenamed { .. } => PROCESS_RENAMED,
        }
    }

    pub fn id(&self) -> ProcessId {
        match self {
            Self::ProcessStarted { id, .. }
            | Self::ProcessStopped { id }
            | Self::ProcessRenamed { id, .. } => *id,
        }
    }
}
