//! Plugin host and event-bus synchronization for telco-store
//!
//! A [`host::Host`] owns one process registry and runs plugins against it.
//! The [`plugins::bus_sync::BusSyncPlugin`] keeps that registry in step with
//! an external event bus reached through the [`bus::BusClient`] contract,
//! reconnecting with exponential backoff whenever the bus goes away.

pub mod bus;
pub mod host;
pub mod plugin;
pub mod plugins;
