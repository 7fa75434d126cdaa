//! Status and outcome classification of remote command output.
//!
//! Both classifiers are pure and total: they never fail, they only degrade
//! to `Unknown` / `None` when the output carries no information.

mod classifier;
mod parser;

pub use classifier::{classify_command_output, ErrorDetail};
pub use parser::{parse_status, ServiceStatus};
