//! Audit logger writing JSON lines to a file.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::error::ControlError;

use super::entry::AuditEntry;

/// Appends audit entries to a file, one JSON object per line.
///
/// A disabled logger accepts entries and drops them.
pub struct AuditLogger {
    sink: Option<(Mutex<File>, PathBuf)>,
}

impl AuditLogger {
    /// Open `path` for appending, creating its parent directory if needed.
    pub fn new(path: &Path) -> Result<Self, ControlError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                debug!(path = %parent.display(), "Creating audit log directory");
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        debug!(path = %path.display(), "Audit logger initialized");

        Ok(Self {
            sink: Some((Mutex::new(file), path.to_path_buf())),
        })
    }

    /// A logger that writes nothing.
    pub fn disabled() -> Self {
        Self { sink: None }
    }

    /// Append `entry` as a single line.
    pub fn log(&self, entry: &AuditEntry) -> Result<(), ControlError> {
        let Some((file, _)) = &self.sink else {
            return Ok(());
        };

        let json = serde_json::to_string(entry)?;

        let mut file = file.lock().map_err(|e| ControlError::Audit {
            message: format!("Failed to acquire audit log lock: {}", e),
        })?;

        writeln!(file, "{}", json)?;

        if let Err(e) = file.sync_data() {
            warn!(error = %e, "Failed to sync audit log");
        }

        debug!(
            request_id = %entry.request_id,
            operation = %entry.operation,
            "Audit entry logged"
        );

        Ok(())
    }

    /// Path of the audit log, if enabled.
    pub fn path(&self) -> Option<&Path> {
        self.sink.as_ref().map(|(_, path)| path.as_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use tempfile::TempDir;
    use uuid::Uuid;

    use crate::controller::{OperationKind, OperationOutcome, ServiceIdentity};

    fn entry(operation: OperationKind) -> AuditEntry {
        AuditEntry::new(
            Uuid::new_v4(),
            operation,
            &ServiceIdentity::new("web-01", "Spooler", "Print Spooler"),
            OperationOutcome::AlreadyInTargetState {
                message: "Print Spooler is already stopped".to_string(),
            },
            Duration::from_millis(12),
        )
    }

    #[test]
    fn test_logger_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("subdir/audit.log");

        let logger = AuditLogger::new(&log_path).unwrap();
        assert!(log_path.parent().unwrap().exists());
        assert_eq!(logger.path(), Some(log_path.as_path()));
    }

    #[test]
    fn test_logger_appends_json_lines() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("audit.log");

        {
            let logger = AuditLogger::new(&log_path).unwrap();
            logger.log(&entry(OperationKind::Stop)).unwrap();
        }
        {
            let logger = AuditLogger::new(&log_path).unwrap();
            logger.log(&entry(OperationKind::Start)).unwrap();
        }

        let content = std::fs::read_to_string(&log_path).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["operation"], "stop");
        assert_eq!(lines[1]["operation"], "start");
        assert_eq!(lines[1]["result"]["outcome"], "already_in_target_state");
    }

    #[test]
    fn test_disabled_logger() {
        let logger = AuditLogger::disabled();
        assert!(logger.log(&entry(OperationKind::Stop)).is_ok());
        assert!(logger.path().is_none());
    }
}
