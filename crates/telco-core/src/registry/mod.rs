//! Process registry
//!
//! Holds the ordered set of tracked processes. Ordering is insertion order
//! (order of first observation), never sorted by id.

mod error;
mod process;
mod shared;

pub use error::RegistryError;
pub use process::{Process, ProcessId};
pub use shared::SharedRegistry;

use std::collections::HashSet;

/// Ordered collection of tracked processes with unique ids.
///
/// All operations are synchronous and touch nothing but the registry's own
/// state. Wrap in [`SharedRegistry`] to share between tasks.
#[derive(Debug, Default, Clone)]
pub struct ProcessRegistry {
    processes: Vec<Process>,
}

impl ProcessRegistry {
    /// Create a new, empty registry.
    pub fn new() -> Self {
        Self {
            processes: Vec::new(),
        }
    }

    /// Append a process to the end of the sequence.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateProcess`] if `id` is already tracked.
    /// The sequence is left unchanged.
    pub fn add_process(
        &mut self,
        id: ProcessId,
        label: impl Into<String>,
    ) -> Result<(), RegistryError> {
        if self.contains(id) {
            return Err(RegistryError::DuplicateProcess { id });
        }
        self.processes.push(Process::new(id, label));
        Ok(())
    }

    /// Remove the process with `id`, closing the gap it leaves.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::ProcessNotFound`] if `id` is not tracked.
    pub fn remove_process(&mut self, id: ProcessId) -> Result<Process, RegistryError> {
        let index = self
            .position(id)
            .ok_or(RegistryError::ProcessNotFound { id })?;
        Ok(self.processes.remove(index))
    }

    /// Replace the label of the process with `id` in place.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::ProcessNotFound`] if `id` is not tracked.
    pub fn rename_process(
        &mut self,
        id: ProcessId,
        new_label: impl Into<String>,
    ) -> Result<(), RegistryError> {
        let process = self
            .processes
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(RegistryError::ProcessNotFound { id })?;
        process.label = new_label.into();
        Ok(())
    }

    /// Snapshot of the current sequence.
    ///
    /// The returned vector is an owned copy; mutating it has no effect on the
    /// registry.
    pub fn list_processes(&self) -> Vec<Process> {
        self.processes.clone()
    }

    /// Drop every tracked process.
    pub fn clear(&mut self) {
        self.processes.clear();
    }

    /// Replace the whole sequence in one step.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateProcess`] for the first repeated id in
    /// `processes`. The current sequence is kept on error.
    pub fn replace_all(&mut self, processes: Vec<Process>) -> Result<(), RegistryError> {
        let mut seen = HashSet::with_capacity(processes.len());
        for process in &processes {
            if !seen.insert(process.id) {
                return Err(RegistryError::DuplicateProcess { id: process.id });
            }
        }
        self.processes = processes;
        Ok(())
    }

    /// Look up a process by id.
    pub fn get(&self, id: ProcessId) -> Option<&Process> {
        self.processes.iter().find(|p| p.id == id)
    }

    /// Return `true` if `id` is tracked.
    pub fn contains(&self, id: ProcessId) -> bool {
        self.position(id).is_some()
    }

    /// Number of tracked processes.
    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    fn position(&self, id: ProcessId) -> Option<usize> {
        self.processes.iter().position(|p| p.id == id)
    }
}
