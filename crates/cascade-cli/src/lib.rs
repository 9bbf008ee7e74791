//! Cascade CLI support
//!
//! - [`fleet`]: TOML fleet description, seeded into an in-memory fleet
//! - [`demo`]: a feature tracking the content of a `VERSION` file
//! - [`simulate`]: one push through detection, approval and fan-out

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod demo;
pub mod fleet;
pub mod simulate;

pub use fleet::{FleetConfig, FleetError, FleetRepo};
pub use simulate::{run, SimulateOptions, SimulationReport};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
