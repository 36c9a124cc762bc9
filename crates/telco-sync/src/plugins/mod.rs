//! Built-in plugins

pub mod bus_sync;
