//! Input validation module.
//!
//! Provides validators for values that end up on a remote command line.

mod service_name;

pub use service_name::validate_service_name;
