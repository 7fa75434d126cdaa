//! Subprocess execution for remote commands.
//!
//! Commands reach the remote host through a launcher program (ssh, winrs,
//! ...) spawned with:
//! - No shell interpretation (direct exec)
//! - Deadline and cancellation from the operation context
//! - Captured stdout/stderr
//! - The child killed when the wait is abandoned

use std::process::{Output, Stdio};

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::RemoteConfig;
use crate::context::OperationContext;
use crate::error::{ControlError, ControlResult, TransportErrorKind};
use crate::storage::ServerRecord;

use super::output::sanitize_output;
use super::traits::RemoteCommandExecutor;

/// Result of a subprocess execution.
#[derive(Debug, Clone)]
pub struct SubprocessResult {
    /// Whether the command exited successfully (exit code 0).
    pub success: bool,
    /// The exit code, if available.
    pub exit_code: Option<i32>,
    /// Captured stdout as a string.
    pub stdout: String,
    /// Captured stderr as a string.
    pub stderr: String,
}

impl SubprocessResult {
    fn from_output(output: Output) -> Self {
        Self {
            success: output.status.success(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }
}

/// Builder for subprocess execution.
pub struct SubprocessBuilder {
    program: String,
    args: Vec<String>,
}

impl SubprocessBuilder {
    /// Create a new subprocess builder.
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
        }
    }

    /// Add arguments to the command.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.args.extend(args.into_iter().map(|s| s.as_ref().to_string()));
        self
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: &str) -> Self {
        self.args.push(arg.to_string());
        self
    }

    /// Execute the command and wait for completion within the context.
    ///
    /// If the context is cancelled or its deadline passes, the child is
    /// killed and a transport error is returned.
    pub async fn run(self, ctx: &OperationContext) -> ControlResult<SubprocessResult> {
        let budget = ctx.remaining().unwrap_or_default();

        debug!(
            program = %self.program,
            args = ?self.args,
            budget_ms = budget.as_millis() as u64,
            "Executing subprocess"
        );

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| {
            ControlError::transport(TransportErrorKind::ExecutionFailed {
                message: format!("Failed to spawn {}: {}", self.program, e),
            })
        })?;

        let start = Instant::now();
        let output = match ctx.run(child.wait_with_output()).await {
            Ok(output) => output.map_err(|e| {
                ControlError::transport(TransportErrorKind::ExecutionFailed {
                    message: format!("Failed to get output from {}: {}", self.program, e),
                })
            })?,
            Err(reason) => {
                // Dropping the wait future killed the child.
                warn!(
                    program = %self.program,
                    reason = ?reason,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Subprocess interrupted, killed"
                );
                return Err(reason.into_transport_error(budget));
            }
        };

        let result = SubprocessResult::from_output(output);
        debug!(
            success = result.success,
            exit_code = ?result.exit_code,
            duration_ms = start.elapsed().as_millis() as u64,
            "Subprocess completed"
        );
        Ok(result)
    }
}

/// Executor that runs each command through a launcher program.
///
/// The command string is passed as the final argument, so `ssh -p 22
/// admin@host` becomes `ssh -p 22 admin@host 'sc.exe query "Spooler"'`.
#[derive(Debug, Clone)]
pub struct CommandLineExecutor {
    program: String,
    args: Vec<String>,
}

impl CommandLineExecutor {
    /// Create an executor from a launcher program and its arguments.
    pub fn new(program: &str, args: Vec<String>) -> Self {
        Self {
            program: program.to_string(),
            args,
        }
    }

    /// Create an executor for `server`, substituting `{address}`, `{port}`
    /// and `{username}` in the configured launcher arguments.
    pub fn for_server(remote: &RemoteConfig, server: &ServerRecord) -> Self {
        let port = server.port.to_string();
        let args = remote
            .args
            .iter()
            .map(|arg| {
                arg.replace("{address}", &server.address)
                    .replace("{port}", &port)
                    .replace("{username}", &server.username)
            })
            .collect();
        Self::new(&remote.program, args)
    }

    /// Launcher program.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Launcher arguments after substitution.
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

#[async_trait]
impl RemoteCommandExecutor for CommandLineExecutor {
    async fn run_command(&self, ctx: &OperationContext, command: &str) -> ControlResult<String> {
        let result = SubprocessBuilder::new(&self.program)
            .args(&self.args)
            .arg(command)
            .run(ctx)
            .await?;

        // The service manager reports rejected requests on stdout with a
        // non-zero exit code; that output belongs to the caller.
        if result.success || !result.stdout.trim().is_empty() {
            return Ok(result.stdout);
        }

        Err(ControlError::transport(TransportErrorKind::ExecutionFailed {
            message: format!(
                "{} exited with {:?}: {}",
                self.program,
                result.exit_code,
                sanitize_output(&result.stderr, 5)
            ),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    fn shell() -> CommandLineExecutor {
        CommandLineExecutor::new("sh", vec!["-c".to_string()])
    }

    #[tokio::test]
    async fn test_run_echo() {
        let ctx = OperationContext::new().with_timeout(Duration::from_secs(5));
        let result = SubprocessBuilder::new("echo")
            .args(["hello", "world"])
            .run(&ctx)
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.exit_code, Some(0));
        assert_eq!(result.stdout.trim(), "hello world");
    }

    #[tokio::test]
    async fn test_nonexistent_program() {
        let ctx = OperationContext::new().with_timeout(Duration::from_secs(5));
        let result = SubprocessBuilder::new("nonexistent_launcher_12345")
            .run(&ctx)
            .await;
        assert!(matches!(
            result,
            Err(ControlError::Transport {
                kind: TransportErrorKind::ExecutionFailed { .. }
            })
        ));
    }

    #[tokio::test]
    async fn test_deadline_kills_child() {
        let ctx = OperationContext::new().with_timeout(Duration::from_millis(100));
        let start = std::time::Instant::now();
        let result = shell().run_command(&ctx, "sleep 5").await;
        assert!(matches!(
            result,
            Err(ControlError::Transport {
                kind: TransportErrorKind::Timeout { .. }
            })
        ));
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_cancel_interrupts_command() {
        let ctx = OperationContext::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });
        let result = shell().run_command(&ctx, "sleep 5").await;
        assert!(result.unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn test_command_output_returned() {
        let ctx = OperationContext::new().with_timeout(Duration::from_secs(5));
        let output = shell()
            .run_command(&ctx, "echo 'STATE : 4 RUNNING'")
            .await
            .unwrap();
        assert_eq!(output.trim(), "STATE : 4 RUNNING");
    }

    #[tokio::test]
    async fn test_rejected_command_output_is_not_transport_error() {
        let ctx = OperationContext::new().with_timeout(Duration::from_secs(5));
        let output = shell()
            .run_command(&ctx, "echo '[SC] StartService FAILED 1056:'; exit 1056")
            .await
            .unwrap();
        assert!(output.contains("FAILED 1056"));
    }

    #[tokio::test]
    async fn test_silent_failure_is_transport_error() {
        let ctx = OperationContext::new().with_timeout(Duration::from_secs(5));
        let err = shell()
            .run_command(&ctx, "echo 'connection refused' >&2; exit 255")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_for_server_substitutes_placeholders() {
        let remote = RemoteConfig::default();
        let server = ServerRecord {
            id: "web-01".to_string(),
            address: "10.0.0.5".to_string(),
            port: 2222,
            username: "ops".to_string(),
        };
        let executor = CommandLineExecutor::for_server(&remote, &server);
        assert_eq!(executor.program(), "ssh");
        assert_eq!(
            executor.args(),
            &["-o", "BatchMode=yes", "-p", "2222", "ops@10.0.0.5"]
        );
    }
}
