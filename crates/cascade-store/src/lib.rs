//! Cascade Stores
//!
//! Two stores sit between the push-driven coordinator and the approval-driven
//! rollout:
//!
//! - [`ValueStore`]: write-once proposals addressed by short [`StorageKey`]s
//! - [`IdealStore`]: the current ideal fingerprint per feature
//!
//! Both are traits so a durable or evicting backend can replace the
//! in-memory ones without touching the control logic.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod error;
mod ideal;
mod value;

pub use error::StoreError;
pub use ideal::{IdealStore, InMemoryIdealStore};
pub use value::{ExpiringValueStore, InMemoryValueStore, StorageKey, ValueStore};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
