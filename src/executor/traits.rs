//! Remote command executor trait.

use async_trait::async_trait;

use crate::context::OperationContext;
use crate::error::ControlResult;

/// Runs a command on a remote host and captures its text output.
///
/// An `Err` means the command could not be run or its result could not be
/// collected (connection dropped, deadline passed). A command that ran but
/// was rejected by the service manager is still `Ok`; the rejection is
/// carried in the output text.
///
/// Implementations should observe `ctx`; callers additionally bound every
/// call by it.
///
/// # Example
///
/// ```ignore
/// pub struct LocalShell;
///
/// #[async_trait]
/// impl RemoteCommandExecutor for LocalShell {
///     async fn run_command(&self, ctx: &OperationContext, command: &str) -> ControlResult<String> {
///         let result = SubprocessBuilder::new("sh").args(["-c", command]).run(ctx).await?;
///         Ok(result.stdout)
///     }
/// }
/// ```
#[async_trait]
pub trait RemoteCommandExecutor: Send + Sync {
    /// Run `command` and return its output.
    async fn run_command(&self, ctx: &OperationContext, command: &str) -> ControlResult<String>;
}
