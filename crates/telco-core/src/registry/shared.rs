//! Shared, thread-safe registry handle.
//!
//! The handle exposes the same operations as [`ProcessRegistry`]. Each call
//! takes the lock, applies the change and releases it before returning, so the
//! lock is never held across an await point.
//!
//! Every successful mutation bumps a revision counter published through a
//! `tokio::sync::watch` channel. Readers (e.g., a renderer) call
//! [`SharedRegistry::subscribe`] and re-read [`SharedRegistry::list_processes`]
//! whenever the revision changes.

use super::{Process, ProcessId, ProcessRegistry, RegistryError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

/// Cloneable handle to one [`ProcessRegistry`].
#[derive(Debug, Clone)]
pub struct SharedRegistry {
    inner: Arc<Mutex<ProcessRegistry>>,
    revision: Arc<watch::Sender<u64>>,
}

impl SharedRegistry {
    /// Create a handle around a new, empty registry.
    pub fn new() -> Self {
        Self::from_registry(ProcessRegistry::new())
    }

    /// Create a handle around an existing registry.
    pub fn from_registry(registry: ProcessRegistry) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: Arc::new(Mutex::new(registry)),
            revision: Arc::new(revision),
        }
    }

    pub fn add_process(
        &self,
        id: ProcessId,
        label: impl Into<String>,
    ) -> Result<(), RegistryError> {
        self.mutate(|reg| reg.add_process(id, label))
    }

    pub fn remove_process(&self, id: ProcessId) -> Result<Process, RegistryError> {
        self.mutate(|reg| reg.remove_process(id))
    }

    pub fn rename_process(
        &self,
        id: ProcessId,
        new_label: impl Into<String>,
    ) -> Result<(), RegistryError> {
        self.mutate(|reg| reg.rename_process(id, new_label))
    }

    pub fn replace_all(&self, processes: Vec<Process>) -> Result<(), RegistryError> {
        self.mutate(|reg| reg.replace_all(processes))
    }

    /// Empty the registry. Publishes a new revision only if anything was removed.
    pub fn clear(&self) {
        let removed = {
            let mut reg = self.lock();
            let removed = !reg.is_empty();
            reg.clear();
            removed
        };
        if removed {
            self.bump();
        }
    }

    /// Owned snapshot of the current sequence.
    pub fn list_processes(&self) -> Vec<Process> {
        self.lock().list_processes()
    }

    pub fn get(&self, id: ProcessId) -> Option<Process> {
        self.lock().get(id).cloned()
    }

    pub fn contains(&self, id: ProcessId) -> bool {
        self.lock().contains(id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Current revision; starts at 0 and increases by one per change.
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// Receive a notification after every change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    fn mutate<T>(
        &self,
        op: impl FnOnce(&mut ProcessRegistry) -> Result<T, RegistryError>,
    ) -> Result<T, RegistryError> {
        let result = {
            let mut reg = self.lock();
            op(&mut reg)
        };
        if result.is_ok() {
            self.bump();
        }
        result
    }

    fn bump(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }

    // A panic while holding the lock cannot leave the Vec half-updated, so a
    // poisoned lock is still safe to read.
    fn lock(&self) -> MutexGuard<'_, ProcessRegistry> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SharedRegistry {
    fn default() -> Self {
        Self::new()
    }
}
