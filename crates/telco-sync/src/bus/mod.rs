//! Event bus contract
//!
//! The bus reports process lifecycle events. Concrete transports live outside
//! this crate; they implement [`BusClient`]. [`MockBus`] is an in-memory
//! implementation for tests and demos.

mod client;
mod event;
mod mock;

pub use client::{BusClient, BusError, Result};
pub use event::{BusEvent, EVENT_NAMES, PROCESS_RENAMED, PROCESS_STARTED, PROCESS_STOPPED};
pub use mock::MockBus;
