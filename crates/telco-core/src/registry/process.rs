use serde::{Deserialize, Serialize};

/// Identifier assigned to a process by the external bus.
pub type ProcessId = u32;

/// One tracked telco process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Process {
    /// Bus-assigned id, unique within a registry
    pub id: ProcessId,
    /// Human-readable descriptor (device or call identifier)
    pub label: String,
}

impl Process {
    pub fn new(id: ProcessId, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
        }
    }
}
