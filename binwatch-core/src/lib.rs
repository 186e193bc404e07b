//! Core types, ports and the polling driver for the binwatch fill-level tracker.

/// Consecutive telemetry failure tracking.
pub mod alarm;
/// `binwatch.toml` loading and validation.
pub mod config;
/// Periodic, cancellable scheduling of tracker cycles.
pub mod driver;
/// Substitute readings for bins that cannot be queried.
pub mod fallback;
/// Capacity threshold filter.
pub mod filter;
/// Domain models shared by all backends.
pub mod model;
/// Registry bundling the ports of each backend.
pub mod plugin;
/// Traits describing the backend interfaces.
pub mod ports;
/// Cycle composition: sensor reader, filter and route requester.
pub mod service;
#[cfg(test)]
mod testing;

pub use config::*;
pub use driver::*;
pub use fallback::*;
pub use model::*;
pub use plugin::*;
pub use ports::*;
pub use service::*;
