//! Server and service records.

use serde::{Deserialize, Serialize};

use crate::config::{ServerConfig, ServiceConfig};
use crate::controller::ServiceIdentity;

/// Connection parameters of a managed host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerRecord {
    pub id: String,
    pub address: String,
    pub port: u16,
    pub username: String,
}

impl From<&ServerConfig> for ServerRecord {
    fn from(config: &ServerConfig) -> Self {
        Self {
            id: config.id.clone(),
            address: config.address.clone(),
            port: config.port,
            username: config.username.clone(),
        }
    }
}

/// A managed service and its last recorded status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub host_id: String,
    pub name: String,
    pub display_name: String,
    /// Last recorded status label, if any.
    pub status: Option<String>,
    /// RFC 3339 timestamp of the last status change.
    pub updated_at: Option<String>,
}

impl ServiceRecord {
    /// Create a record with no recorded status.
    pub fn new(host_id: &str, name: &str, display_name: &str) -> Self {
        Self {
            host_id: host_id.to_string(),
            name: name.to_string(),
            display_name: display_name.to_string(),
            status: None,
            updated_at: None,
        }
    }

    /// Identity handed to the orchestrator.
    pub fn identity(&self) -> ServiceIdentity {
        ServiceIdentity::new(&self.host_id, &self.name, &self.display_name)
    }
}

impl From<&ServiceConfig> for ServiceRecord {
    fn from(config: &ServiceConfig) -> Self {
        let display_name = config.display_name.as_deref().unwrap_or(&config.name);
        Self::new(&config.host_id, &config.name, display_name)
    }
}
