//! Core types for telco-store
//!
//! This crate holds the in-memory registry of tracked telco processes
//! (live device and call sessions reported by an external bus), the shared
//! handle used by plugins and readers, configuration resolution, and logging
//! initialization.
//!
//! The registry is the single source of truth for process state: every change
//! goes through [`ProcessRegistry`] mutation operations, whether the caller is
//! the bus sync plugin or a test.

pub mod config;
pub mod logging;
pub mod registry;

pub use registry::{Process, ProcessId, ProcessRegistry, RegistryError, SharedRegistry};

// Re-export toml for plugin config access
pub use toml;
