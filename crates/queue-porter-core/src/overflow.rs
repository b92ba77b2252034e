//! Gateway to the blob store hosting overflowed payloads.
//!
//! Blob names carry an expiration-date prefix
//! (`<utc-now + retention>/<queue-name>/<uuid>`) so a janitor can sweep
//! payloads older than the maximum in-flight lifetime without consulting
//! the queues.

use crate::observer::{NoOpObserver, StorageObserver};
use crate::retry::{await_provisioned, RetryPolicy};
use crate::serializer::OverflowReference;
use bytes::Bytes;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use storage_runtime::{BlobService, QueueName, StorageError};
use tracing::{debug, warn};
use uuid::Uuid;

/// Blob access for overflow payloads
pub struct OverflowStore {
    service: Arc<dyn BlobService>,
    retry: RetryPolicy,
    container: String,
    observer: Arc<dyn StorageObserver>,
}

impl OverflowStore {
    /// Create new overflow store writing into `container`
    pub fn new(service: Arc<dyn BlobService>, retry: RetryPolicy, container: String) -> Self {
        Self {
            service,
            retry,
            container,
            observer: Arc::new(NoOpObserver),
        }
    }

    /// Report settling-window retries through `observer`
    pub fn with_observer(mut self, observer: Arc<dyn StorageObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Container receiving overflow payloads
    pub fn container(&self) -> &str {
        &self.container
    }

    /// Allocate a fresh blob reference for a payload bound for `queue`
    pub fn allocate_reference(&self, queue: &QueueName, retention: Duration) -> OverflowReference {
        let expires = Utc::now()
            + chrono::Duration::from_std(retention).unwrap_or_else(|_| chrono::Duration::days(7));

        OverflowReference {
            container: self.container.clone(),
            blob_name: format!(
                "{}/{}/{}",
                expires.format("%Y-%m-%d"),
                queue.as_str(),
                Uuid::new_v4()
            ),
        }
    }

    /// Upload a payload, creating the container on demand
    pub async fn put(
        &self,
        reference: &OverflowReference,
        body: Bytes,
    ) -> Result<(), StorageError> {
        match self
            .service
            .upload_blob(&reference.container, &reference.blob_name, body.clone())
            .await
        {
            Err(error) if error.is_not_found() => {
                debug!(container = %reference.container, "container missing on upload, creating it");
                self.service.create_container(&reference.container).await?;
                await_provisioned(&self.retry, self.observer.as_ref(), "upload_blob", || {
                    self.service
                        .upload_blob(&reference.container, &reference.blob_name, body.clone())
                })
                .await
            }
            other => other,
        }
    }

    /// Download a payload; absence is `None`, not an error
    pub async fn get(&self, reference: &OverflowReference) -> Result<Option<Bytes>, StorageError> {
        self.service
            .download_blob(&reference.container, &reference.blob_name)
            .await
    }

    /// Best-effort delete; absence is acceptable
    pub async fn delete(&self, reference: &OverflowReference) -> bool {
        match self
            .service
            .delete_blob(&reference.container, &reference.blob_name)
            .await
        {
            Ok(removed) => removed,
            Err(error) if error.is_not_found() => false,
            Err(error) => {
                warn!(
                    blob = %reference.blob_name,
                    error = %error,
                    "failed to delete overflow payload; janitor sweep will reclaim it"
                );
                false
            }
        }
    }
}

#[cfg(test)]
#[path = "overflow_tests.rs"]
mod tests;
