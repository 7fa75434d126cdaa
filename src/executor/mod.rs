//! Remote command execution.
//!
//! Defines the executor capability the orchestrator runs commands through,
//! the command lines it issues, and a subprocess-backed implementation.

mod command;
mod output;
mod probe;
mod subprocess;
mod traits;

pub use command::ServiceCommand;
pub use output::sanitize_output;
pub use probe::host_reachable;
pub use subprocess::{CommandLineExecutor, SubprocessBuilder, SubprocessResult};
pub use traits::RemoteCommandExecutor;
