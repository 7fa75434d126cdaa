//! Server, service and status storage.
//!
//! The orchestrator only sees the narrow [`StatusSink`] view; lookups of
//! servers and services happen before it runs.

mod inventory;
mod records;
mod traits;

pub use inventory::InventoryStore;
pub use records::{ServerRecord, ServiceRecord};
pub use traits::{StatusLabel, StatusSink, Storage};
