//! Audit logging module.
//!
//! Every control request leaves one JSON line in the audit log, whatever
//! its outcome.

mod entry;
mod logger;

pub use entry::AuditEntry;
pub use logger::AuditLogger;
