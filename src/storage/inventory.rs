//! Configuration-backed inventory store.
//!
//! Holds the servers and services declared in the configuration and the
//! last status label recorded for each service. When a state file is
//! configured, labels survive restarts: they are loaded on startup and the
//! file is rewritten after every change.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::context::OperationContext;
use crate::error::{ControlError, ControlResult, InventoryErrorKind};

use super::records::{ServerRecord, ServiceRecord};
use super::traits::{StatusLabel, StatusSink, Storage};

type ServiceKey = (String, String);

/// One persisted status entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredStatus {
    host_id: String,
    service: String,
    status: String,
    updated_at: String,
}

/// In-memory [`Storage`] built from configuration.
pub struct InventoryStore {
    servers: HashMap<String, ServerRecord>,
    services: Mutex<HashMap<ServiceKey, ServiceRecord>>,
    state_file: Option<PathBuf>,
}

impl InventoryStore {
    /// Create a store from explicit records.
    pub fn new(servers: Vec<ServerRecord>, services: Vec<ServiceRecord>) -> Self {
        Self {
            servers: servers.into_iter().map(|s| (s.id.clone(), s)).collect(),
            services: Mutex::new(
                services
                    .into_iter()
                    .map(|s| ((s.host_id.clone(), s.name.clone()), s))
                    .collect(),
            ),
            state_file: None,
        }
    }

    /// Create a store from the `[[servers]]`, `[[services]]` and
    /// `[storage]` settings.
    pub fn from_settings(settings: &Settings) -> ControlResult<Self> {
        let store = Self::new(
            settings.servers.iter().map(ServerRecord::from).collect(),
            settings.services.iter().map(ServiceRecord::from).collect(),
        );

        match &settings.storage.state_file {
            Some(path) => store.with_state_file(path),
            None => Ok(store),
        }
    }

    /// Persist labels to `path`, loading any labels already stored there.
    ///
    /// The state file is a cache: an unreadable or corrupt file is logged
    /// and replaced on the next write.
    pub fn with_state_file(mut self, path: &Path) -> ControlResult<Self> {
        if path.exists() {
            match load_state(path) {
                Ok(stored) => {
                    let services = self.services.get_mut();
                    let mut loaded = 0;
                    for entry in stored {
                        if let Some(record) = services.get_mut(&(entry.host_id, entry.service)) {
                            record.status = Some(entry.status);
                            record.updated_at = Some(entry.updated_at);
                            loaded += 1;
                        }
                    }
                    info!(path = %path.display(), loaded, "Loaded service status state");
                }
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "Ignoring unreadable service status state"
                    );
                }
            }
        }

        self.state_file = Some(path.to_path_buf());
        Ok(self)
    }

    /// Number of declared services.
    pub async fn service_count(&self) -> usize {
        self.services.lock().await.len()
    }

    async fn persist(
        &self,
        ctx: &OperationContext,
        services: &HashMap<ServiceKey, ServiceRecord>,
    ) -> ControlResult<()> {
        let Some(path) = &self.state_file else {
            return Ok(());
        };

        let mut stored: Vec<StoredStatus> = services
            .values()
            .filter_map(|record| {
                Some(StoredStatus {
                    host_id: record.host_id.clone(),
                    service: record.name.clone(),
                    status: record.status.clone()?,
                    updated_at: record.updated_at.clone().unwrap_or_default(),
                })
            })
            .collect();
        stored.sort_by(|a, b| (&a.host_id, &a.service).cmp(&(&b.host_id, &b.service)));

        let json = serde_json::to_vec_pretty(&stored)?;
        let tmp = temp_path(path);
        let write = async {
            tokio::fs::write(&tmp, json).await?;
            tokio::fs::rename(&tmp, path).await?;
            Ok::<(), std::io::Error>(())
        };
        let result = ctx.run(write).await.map_err(|reason| ControlError::Storage {
            message: format!(
                "Writing state file '{}' interrupted: {}",
                path.display(),
                reason
            ),
        });
        if !matches!(result, Ok(Ok(()))) {
            let _ = tokio::fs::remove_file(&tmp).await;
        }
        result??;

        debug!(path = %path.display(), entries = stored.len(), "State file written");
        Ok(())
    }
}

fn load_state(path: &Path) -> ControlResult<Vec<StoredStatus>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Sibling path the state is written to before being renamed into place.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[async_trait]
impl StatusSink for InventoryStore {
    async fn change_service_status(
        &self,
        ctx: &OperationContext,
        host_id: &str,
        service_name: &str,
        label: StatusLabel,
    ) -> ControlResult<()> {
        let mut services = self.services.lock().await;

        let record = services
            .get_mut(&(host_id.to_string(), service_name.to_string()))
            .ok_or_else(|| ControlError::Inventory {
                kind: InventoryErrorKind::UnknownService {
                    host_id: host_id.to_string(),
                    service: service_name.to_string(),
                },
            })?;

        let previous = (record.status.take(), record.updated_at.take());
        record.status = Some(label.as_str().to_string());
        record.updated_at = Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true));

        if let Err(e) = self.persist(ctx, &services).await {
            if let Some(record) = services.get_mut(&(host_id.to_string(), service_name.to_string())) {
                (record.status, record.updated_at) = previous;
            }
            return Err(e);
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for InventoryStore {
    async fn get_server(&self, host_id: &str) -> ControlResult<ServerRecord> {
        self.servers
            .get(host_id)
            .cloned()
            .ok_or_else(|| ControlError::Inventory {
                kind: InventoryErrorKind::UnknownServer {
                    host_id: host_id.to_string(),
                },
            })
    }

    async fn get_service(&self, host_id: &str, service_name: &str) -> ControlResult<ServiceRecord> {
        if !self.servers.contains_key(host_id) {
            return Err(ControlError::Inventory {
                kind: InventoryErrorKind::UnknownServer {
                    host_id: host_id.to_string(),
                },
            });
        }

        self.services
            .lock()
            .await
            .get(&(host_id.to_string(), service_name.to_string()))
            .cloned()
            .ok_or_else(|| ControlError::Inventory {
                kind: InventoryErrorKind::UnknownService {
                    host_id: host_id.to_string(),
                    service: service_name.to_string(),
                },
            })
    }
}
