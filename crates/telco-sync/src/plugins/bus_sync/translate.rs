//! Bus event → registry mutation translation
//!
//! Each event maps to exactly one registry operation. Registry errors are
//! resolved here and never leave the plugin:
//!
//! | event             | operation         | on error                            |
//! |-------------------|-------------------|-------------------------------------|
//! | `process-started` | `add_process`     | duplicate → `rename_process`        |
//! | `process-stopped` | `remove_process`  | not found → ignored (logged)        |
//! | `process-renamed` | `rename_process`  | not found → `add_process`           |

use crate::bus::BusEvent;
use telco_core::{ProcessId, RegistryError, SharedRegistry};
use tracing::{debug, warn};

/// What an event did to the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// New process appended
    Added(ProcessId),
    /// Re-announced start; label refreshed in place
    Relabeled(ProcessId),
    /// Process removed
    Removed(ProcessId),
    /// Stop for a process that was not tracked
    AlreadyRemoved(ProcessId),
    /// Label updated
    Renamed(ProcessId),
    /// Rename for an untracked process; appended as a missed start
    Recovered(ProcessId),
    /// Another writer won the race; nothing applied
    Skipped(ProcessId),
}

/// Apply one bus event to the registry
pub fn apply_event(registry: &SharedRegistry, event: BusEvent) -> Applied {
    match event {
        BusEvent::ProcessStarted { id, label } => match registry.add_process(id, label.clone()) {
            Ok(()) => Applied::Added(id),
            Err(RegistryError::DuplicateProcess { .. }) => {
                debug!("process {id} re-announced, refreshing label");
                match registry.rename_process(id, label) {
                    Ok(()) => Applied::Relabeled(id),
                    Err(e) => unexpected(id, e),
                }
            }
            Err(e) => unexpected(id, e),
        },

        BusEvent::ProcessStopped { id } => match registry.remove_process(id) {
            Ok(_) => Applied::Removed(id),
            Err(RegistryError::ProcessNotFound { .. }) => {
                debug!("process {id} already gone, ignoring stop");
                Applied::AlreadyRemoved(id)
            }
            Err(e) => unexpected(id, e),
        },

        BusEvent::ProcessRenamed { id, label } => match registry.rename_process(id, label.clone()) {
            Ok(()) => Applied::Renamed(id),
            Err(RegistryError::ProcessNotFound { .. }) => {
                warn!("rename for untracked process {id}, treating as missed start");
                match registry.add_process(id, label) {
                    Ok(()) => Applied::Recovered(id),
                    Err(e) => unexpected(id, e),
                }
            }
            Err(e) => unexpected(id, e),
        },
    }
}

// Only reachable if another writer changes the registry between the two
// calls of a fallback. The registry is still consistent.
fn unexpected(id: ProcessId, e: RegistryError) -> Applied {
    warn!("process {id}: registry changed underneath bus sync: {e}");
    Applied::Skipped(id)
}
