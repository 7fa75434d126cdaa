//! Configuration settings for the service control orchestrator.

use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ControlError;
use crate::validation::validate_service_name;

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub backoff: BackoffConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub audit: AuditConfig,
    #[serde(default)]
    pub servers: Vec<ServerConfig>,
    #[serde(default)]
    pub services: Vec<ServiceConfig>,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format ("pretty" or "json").
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Per-step deadlines of a control operation.
#[derive(Debug, Clone, Deserialize)]
pub struct ControlConfig {
    /// Deadline of the initial status query.
    #[serde(default = "default_query_timeout")]
    pub query_timeout_ms: u64,
    /// Deadline of each start/stop command.
    #[serde(default = "default_action_timeout")]
    pub action_timeout_ms: u64,
    /// Deadline of the convergence wait during a restart.
    #[serde(default = "default_wait_timeout")]
    pub wait_timeout_ms: u64,
    /// Overall deadline of one invocation.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
    /// Service control program invoked on the remote host.
    #[serde(default = "default_control_program")]
    pub control_program: String,
}

/// Convergence polling schedule.
#[derive(Debug, Clone, Deserialize)]
pub struct BackoffConfig {
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: u32,
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
}

/// How commands reach a remote host.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    /// Launcher program (e.g. "ssh").
    #[serde(default = "default_remote_program")]
    pub program: String,
    /// Launcher arguments; `{address}`, `{port}` and `{username}` are
    /// substituted from the server record.
    #[serde(default = "default_remote_args")]
    pub args: Vec<String>,
    /// Timeout of the TCP reachability probe.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_ms: u64,
}

/// Status storage configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct StorageConfig {
    /// JSON file holding the last known status label per service.
    pub state_file: Option<PathBuf>,
}

/// Audit logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    /// Whether audit logging is enabled.
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,
    /// Path to the audit log file.
    #[serde(default = "default_audit_log_path")]
    pub log_path: PathBuf,
}

/// A managed host.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub id: String,
    pub address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_username")]
    pub username: String,
}

/// A managed service on a host.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub host_id: String,
    /// Name the remote service manager knows the service by.
    pub name: String,
    /// Human-readable name; defaults to `name`.
    pub display_name: Option<String>,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_query_timeout() -> u64 {
    5_000
}

fn default_action_timeout() -> u64 {
    30_000
}

fn default_wait_timeout() -> u64 {
    30_000
}

fn default_request_timeout() -> u64 {
    60_000
}

fn default_control_program() -> String {
    "sc.exe".to_string()
}

fn default_initial_delay() -> u64 {
    100
}

fn default_multiplier() -> u32 {
    2
}

fn default_max_delay() -> u64 {
    5_000
}

fn default_remote_program() -> String {
    "ssh".to_string()
}

fn default_remote_args() -> Vec<String> {
    ["-o", "BatchMode=yes", "-p", "{port}", "{username}@{address}"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_probe_timeout() -> u64 {
    3_000
}

fn default_audit_enabled() -> bool {
    true
}

fn default_audit_log_path() -> PathBuf {
    PathBuf::from("/var/log/lumo/svcctl-audit.log")
}

fn default_port() -> u16 {
    22
}

fn default_username() -> String {
    "Administrator".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            query_timeout_ms: default_query_timeout(),
            action_timeout_ms: default_action_timeout(),
            wait_timeout_ms: default_wait_timeout(),
            request_timeout_ms: default_request_timeout(),
            control_program: default_control_program(),
        }
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay(),
            multiplier: default_multiplier(),
            max_delay_ms: default_max_delay(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            program: default_remote_program(),
            args: default_remote_args(),
            probe_timeout_ms: default_probe_timeout(),
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
            log_path: default_audit_log_path(),
        }
    }
}

impl ControlConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    pub fn action_timeout(&self) -> Duration {
        Duration::from_millis(self.action_timeout_ms)
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl RemoteConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

impl Settings {
    /// Load settings from a TOML configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ControlError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ControlError::Config {
            message: format!("Failed to read config file '{}': {}", path.display(), e),
        })?;

        Self::from_toml(&content).map_err(|e| match e {
            ControlError::Config { message } => ControlError::Config {
                message: format!("{} ({})", message, path.display()),
            },
            other => other,
        })
    }

    /// Parse and validate settings from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ControlError> {
        let settings: Settings = toml::from_str(content).map_err(|e| ControlError::Config {
            message: format!("Failed to parse config: {}", e),
        })?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate the settings.
    fn validate(&self) -> Result<(), ControlError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ControlError::Config {
                message: format!(
                    "Invalid log level '{}'. Valid levels: {:?}",
                    self.logging.level, valid_levels
                ),
            });
        }

        let valid_formats = ["pretty", "json"];
        if !valid_formats.contains(&self.logging.format.to_lowercase().as_str()) {
            return Err(ControlError::Config {
                message: format!(
                    "Invalid log format '{}'. Valid formats: {:?}",
                    self.logging.format, valid_formats
                ),
            });
        }

        let timeouts = [
            ("control.query_timeout_ms", self.control.query_timeout_ms),
            ("control.action_timeout_ms", self.control.action_timeout_ms),
            ("control.wait_timeout_ms", self.control.wait_timeout_ms),
            ("control.request_timeout_ms", self.control.request_timeout_ms),
            ("remote.probe_timeout_ms", self.remote.probe_timeout_ms),
        ];
        if let Some((name, _)) = timeouts.iter().find(|(_, value)| *value == 0) {
            return Err(ControlError::Config {
                message: format!("'{}' must be greater than zero", name),
            });
        }

        if self.control.control_program.trim().is_empty() {
            return Err(ControlError::Config {
                message: "'control.control_program' cannot be empty".to_string(),
            });
        }

        if self.backoff.multiplier == 0 {
            return Err(ControlError::Config {
                message: "'backoff.multiplier' must be at least 1".to_string(),
            });
        }

        if self.backoff.initial_delay_ms == 0
            || self.backoff.initial_delay_ms > self.backoff.max_delay_ms
        {
            return Err(ControlError::Config {
                message: format!(
                    "Invalid backoff delays: initial {}ms must be non-zero and not exceed max {}ms",
                    self.backoff.initial_delay_ms, self.backoff.max_delay_ms
                ),
            });
        }

        let mut server_ids = HashSet::new();
        for server in &self.servers {
            if server.id.is_empty() || server.address.is_empty() {
                return Err(ControlError::Config {
                    message: "Server entries need a non-empty 'id' and 'address'".to_string(),
                });
            }
            if !server_ids.insert(server.id.as_str()) {
                return Err(ControlError::Config {
                    message: format!("Duplicate server id '{}'", server.id),
                });
            }
        }

        for service in &self.services {
            if !server_ids.contains(service.host_id.as_str()) {
                return Err(ControlError::Config {
                    message: format!(
                        "Service '{}' references unknown server '{}'",
                        service.name, service.host_id
                    ),
                });
            }
            validate_service_name(&service.name).map_err(|e| ControlError::Config {
                message: e.to_string(),
            })?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[logging]
level = "debug"
format = "json"

[control]
query_timeout_ms = 2000

[backoff]
initial_delay_ms = 50
max_delay_ms = 1000

[[servers]]
id = "web-01"
address = "10.0.0.5"

[[services]]
host_id = "web-01"
name = "W3SVC"
display_name = "World Wide Web Publishing Service"

[[services]]
host_id = "web-01"
name = "Print Spooler"
"#;

    #[test]
    fn test_default_values() {
        assert_eq!(default_log_level(), "info");
        assert_eq!(default_log_format(), "pretty");
        assert_eq!(default_query_timeout(), 5_000);
        assert_eq!(default_action_timeout(), 30_000);
        assert_eq!(default_control_program(), "sc.exe");
    }

    #[test]
    fn test_parse_sample() {
        let settings = Settings::from_toml(SAMPLE).unwrap();
        assert_eq!(settings.logging.level, "debug");
        assert_eq!(settings.control.query_timeout(), Duration::from_secs(2));
        assert_eq!(settings.control.action_timeout(), Duration::from_secs(30));
        assert_eq!(settings.backoff.multiplier, 2);
        assert_eq!(settings.servers[0].port, 22);
        assert_eq!(settings.services.len(), 2);
        assert!(settings.services[1].display_name.is_none());
        assert!(settings.storage.state_file.is_none());
        assert!(settings.audit.enabled);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings.remote.program, "ssh");
        assert_eq!(settings.backoff.max_delay_ms, 5_000);
        assert!(settings.servers.is_empty());
    }

    #[test]
    fn test_invalid_log_level() {
        let err = Settings::from_toml("[logging]\nlevel = \"loud\"\n").unwrap_err();
        assert!(matches!(err, ControlError::Config { .. }));
    }

    #[test]
    fn test_invalid_backoff() {
        assert!(Settings::from_toml("[backoff]\nmultiplier = 0\n").is_err());
        assert!(Settings::from_toml("[backoff]\ninitial_delay_ms = 9000\n").is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = Settings::from_toml("[control]\nwait_timeout_ms = 0\n").unwrap_err();
        assert!(err.to_string().contains("control.wait_timeout_ms"));
    }

    #[test]
    fn test_service_with_unknown_server() {
        let config = "[[services]]\nhost_id = \"ghost\"\nname = \"Spooler\"\n";
        let err = Settings::from_toml(config).unwrap_err();
        assert!(err.to_string().contains("unknown server 'ghost'"));
    }

    #[test]
    fn test_duplicate_server_ids() {
        let config = "[[servers]]\nid = \"a\"\naddress = \"h1\"\n\n[[servers]]\nid = \"a\"\naddress = \"h2\"\n";
        assert!(Settings::from_toml(config).is_err());
    }

    #[test]
    fn test_invalid_service_name_rejected() {
        let config = "[[servers]]\nid = \"a\"\naddress = \"h1\"\n\n[[services]]\nhost_id = \"a\"\nname = 'bad\"name'\n";
        assert!(Settings::from_toml(config).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("svcctl.toml");
        std::fs::write(&path, SAMPLE).unwrap();
        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.servers[0].id, "web-01");

        assert!(Settings::load(dir.path().join("missing.toml")).is_err());
    }
}
