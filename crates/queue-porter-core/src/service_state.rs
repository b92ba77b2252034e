//! Management facade for per-service on/off flags.
//!
//! A tiny key-value layer over the blob store: each service's flag lives in
//! one JSON blob under a fixed prefix. The facade knows nothing about the
//! queue core, and the set of services worth listing is the caller's
//! business.

use crate::observer::NoOpObserver;
use crate::retry::{await_provisioned, RetryPolicy};
use crate::serializer::PayloadError;
use crate::{PorterResult, CONTROL_CONTAINER};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use storage_runtime::BlobService;
use tracing::debug;

/// Blob name prefix of service-state flags
pub const SERVICE_STATE_PREFIX: &str = "service-state";

/// Logical on/off state of a service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceState {
    Started,
    Stopped,
}

impl ServiceState {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "Started",
            Self::Stopped => "Stopped",
        }
    }

    /// The opposite state
    pub fn toggled(&self) -> Self {
        match self {
            Self::Started => Self::Stopped,
            Self::Stopped => Self::Started,
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Persisted form of one service flag
#[derive(Debug, Serialize, Deserialize)]
struct ServiceStateRecord {
    state: ServiceState,
    updated_at: DateTime<Utc>,
}

/// Registry of persisted service-state flags
pub struct ServiceStateRegistry {
    blobs: Arc<dyn BlobService>,
    retry: RetryPolicy,
    container: String,
}

impl ServiceStateRegistry {
    /// Create new registry in the default control container
    pub fn new(blobs: Arc<dyn BlobService>) -> Self {
        Self {
            blobs,
            retry: RetryPolicy::default(),
            container: CONTROL_CONTAINER.to_string(),
        }
    }

    /// Use a different container
    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = container.into();
        self
    }

    fn blob_name(service: &str) -> String {
        format!("{}/{}", SERVICE_STATE_PREFIX, service)
    }

    /// Read a service's flag; absent flags read as `None`
    pub async fn read(&self, service: &str) -> PorterResult<Option<ServiceState>> {
        let blob = self
            .blobs
            .download_blob(&self.container, &Self::blob_name(service))
            .await?;

        match blob {
            None => Ok(None),
            Some(bytes) => {
                let record: ServiceStateRecord =
                    serde_json::from_slice(&bytes).map_err(PayloadError::Decode)?;
                Ok(Some(record.state))
            }
        }
    }

    /// Upsert a service's flag, creating the container on demand
    pub async fn set(&self, service: &str, state: ServiceState) -> PorterResult<()> {
        let record = ServiceStateRecord {
            state,
            updated_at: Utc::now(),
        };
        let body = Bytes::from(serde_json::to_vec(&record).map_err(PayloadError::Encode)?);
        let blob_name = Self::blob_name(service);

        let result = self
            .blobs
            .upload_blob(&self.container, &blob_name, body.clone())
            .await;
        match result {
            Err(error) if error.is_not_found() => {
                debug!(container = %self.container, "control container missing, creating it");
                self.blobs.create_container(&self.container).await?;
                await_provisioned(&self.retry, &NoOpObserver, "upload_blob", || {
                    self.blobs.upload_blob(&self.container, &blob_name, body.clone())
                })
                .await?;
            }
            other => other?,
        }

        debug!(service, state = %state, "service state updated");
        Ok(())
    }

    /// Flip a service's flag and return the new state
    ///
    /// A service with no persisted flag counts as started, so the first
    /// toggle stops it.
    pub async fn toggle(&self, service: &str) -> PorterResult<ServiceState> {
        let current = self.read(service).await?.unwrap_or(ServiceState::Started);
        let next = current.toggled();
        self.set(service, next).await?;
        Ok(next)
    }

    /// List every service with a persisted flag
    pub async fn list(&self) -> PorterResult<Vec<(String, ServiceState)>> {
        let prefix = format!("{}/", SERVICE_STATE_PREFIX);
        let blobs = self.blobs.list_blobs(&self.container, &prefix).await?;

        let mut services = Vec::with_capacity(blobs.len());
        for blob in blobs {
            let Some(service) = blob.strip_prefix(&prefix) else {
                continue;
            };
            if let Some(state) = self.read(service).await? {
                services.push((service.to_string(), state));
            }
        }
        Ok(services)
    }

    /// Remove a service's flag; returns false when none existed
    pub async fn delete(&self, service: &str) -> PorterResult<bool> {
        Ok(self
            .blobs
            .delete_blob(&self.container, &Self::blob_name(service))
            .await?)
    }
}

#[cfg(test)]
#[path = "service_state_tests.rs"]
mod tests;
