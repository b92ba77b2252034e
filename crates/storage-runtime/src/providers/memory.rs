//! In-memory storage provider implementation for testing and development.
//!
//! This module provides fully functional in-memory queue and blob services
//! that:
//! - Enforce explicit queue/container creation so lazy-creation paths in
//!   higher layers are exercised realistically
//! - Implement visibility timeouts with receipt invalidation on redelivery
//! - Preserve per-queue FIFO order
//! - Provide thread-safe concurrent access
//!
//! These services are intended for unit testing of storage-runtime
//! consumers, development, and as a reference for cloud providers.

use crate::error::StorageError;
use crate::message::{PopReceipt, QueueName, RawMessage};
use crate::service::{BlobService, QueueService};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;

/// Default payload limit, deliberately generous for tests
const DEFAULT_MAX_MESSAGE_SIZE: usize = 8 * 1024 * 1024;

// ============================================================================
// Internal Queue Storage
// ============================================================================

/// A message stored in a queue
#[derive(Debug, Clone)]
struct StoredMessage {
    message_id: String,
    body: Bytes,
    dequeue_count: u32,
}

/// A delivered message waiting for acknowledgement or redelivery
#[derive(Debug)]
struct LeasedMessage {
    message: StoredMessage,
    receipt: String,
    visible_again_at: DateTime<Utc>,
}

/// State of a single queue
#[derive(Debug, Default)]
struct MemoryQueue {
    /// Messages available for delivery, FIFO
    visible: VecDeque<StoredMessage>,
    /// Delivered messages keyed by message id
    leased: HashMap<String, LeasedMessage>,
}

impl MemoryQueue {
    /// Move expired leases back to the visible queue, invalidating their
    /// receipts
    fn reap_expired_leases(&mut self, now: DateTime<Utc>) {
        let expired: Vec<String> = self
            .leased
            .iter()
            .filter(|(_, lease)| lease.visible_again_at <= now)
            .map(|(id, _)| id.clone())
            .collect();

        for id in expired {
            if let Some(lease) = self.leased.remove(&id) {
                self.visible.push_back(lease.message);
            }
        }
    }

    fn message_count(&self) -> u64 {
        (self.visible.len() + self.leased.len()) as u64
    }
}

// ============================================================================
// InMemoryQueueService
// ============================================================================

/// In-memory queue service implementation
#[derive(Debug)]
pub struct InMemoryQueueService {
    queues: RwLock<HashMap<QueueName, MemoryQueue>>,
    max_message_size: usize,
}

impl InMemoryQueueService {
    /// Create new in-memory queue service
    pub fn new() -> Self {
        Self {
            queues: RwLock::new(HashMap::new()),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }

    /// Create new in-memory queue service with a custom payload limit
    pub fn with_max_message_size(max_message_size: usize) -> Self {
        Self {
            queues: RwLock::new(HashMap::new()),
            max_message_size,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<QueueName, MemoryQueue>> {
        self.queues.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<QueueName, MemoryQueue>> {
        self.queues.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for InMemoryQueueService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueueService for InMemoryQueueService {
    async fn create_queue(&self, queue: &QueueName) -> Result<(), StorageError> {
        let mut queues = self.write();
        queues.entry(queue.clone()).or_default();
        Ok(())
    }

    async fn delete_queue(&self, queue: &QueueName) -> Result<(), StorageError> {
        let mut queues = self.write();
        if queues.remove(queue).is_none() {
            return Err(StorageError::QueueNotFound {
                queue: queue.to_string(),
            });
        }
        Ok(())
    }

    async fn list_queues(&self, prefix: &str) -> Result<Vec<QueueName>, StorageError> {
        let queues = self.read();
        let mut names: Vec<QueueName> = queues
            .keys()
            .filter(|name| name.as_str().starts_with(prefix))
            .cloned()
            .collect();
        names.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(names)
    }

    async fn put_message(&self, queue: &QueueName, body: Bytes) -> Result<(), StorageError> {
        if body.len() > self.max_message_size {
            return Err(StorageError::MessageTooLarge {
                size: body.len(),
                max_size: self.max_message_size,
            });
        }

        let mut queues = self.write();
        let state = queues
            .get_mut(queue)
            .ok_or_else(|| StorageError::QueueNotFound {
                queue: queue.to_string(),
            })?;

        state.visible.push_back(StoredMessage {
            message_id: uuid::Uuid::new_v4().to_string(),
            body,
            dequeue_count: 0,
        });
        Ok(())
    }

    async fn get_messages(
        &self,
        queue: &QueueName,
        max_messages: u32,
        visibility_timeout: Duration,
    ) -> Result<Vec<RawMessage>, StorageError> {
        let now = Utc::now();
        let visible_again_at = now
            + chrono::Duration::from_std(visibility_timeout)
                .unwrap_or_else(|_| chrono::Duration::seconds(30));

        let mut queues = self.write();
        let state = queues
            .get_mut(queue)
            .ok_or_else(|| StorageError::QueueNotFound {
                queue: queue.to_string(),
            })?;

        state.reap_expired_leases(now);

        let mut delivered = Vec::new();
        while delivered.len() < max_messages as usize {
            let Some(mut message) = state.visible.pop_front() else {
                break;
            };
            message.dequeue_count += 1;

            let receipt = uuid::Uuid::new_v4().to_string();
            delivered.push(RawMessage {
                receipt: PopReceipt::new(message.message_id.clone(), receipt.clone()),
                body: message.body.clone(),
                dequeue_count: message.dequeue_count,
            });

            state.leased.insert(
                message.message_id.clone(),
                LeasedMessage {
                    message,
                    receipt,
                    visible_again_at,
                },
            );
        }

        Ok(delivered)
    }

    async fn delete_message(
        &self,
        queue: &QueueName,
        receipt: &PopReceipt,
    ) -> Result<(), StorageError> {
        let mut queues = self.write();
        let state = queues
            .get_mut(queue)
            .ok_or_else(|| StorageError::QueueNotFound {
                queue: queue.to_string(),
            })?;

        match state.leased.get(receipt.message_id()) {
            Some(lease) if lease.receipt == receipt.receipt() => {
                state.leased.remove(receipt.message_id());
                Ok(())
            }
            Some(_) => Err(StorageError::ReceiptRejected {
                message_id: receipt.message_id().to_string(),
                reason: "receipt superseded by a newer delivery".to_string(),
            }),
            None => Err(StorageError::ReceiptRejected {
                message_id: receipt.message_id().to_string(),
                reason: "no matching delivery".to_string(),
            }),
        }
    }

    async fn clear_messages(&self, queue: &QueueName) -> Result<(), StorageError> {
        let mut queues = self.write();
        let state = queues
            .get_mut(queue)
            .ok_or_else(|| StorageError::QueueNotFound {
                queue: queue.to_string(),
            })?;

        state.visible.clear();
        state.leased.clear();
        Ok(())
    }

    async fn approximate_message_count(&self, queue: &QueueName) -> Result<u64, StorageError> {
        let queues = self.read();
        let state = queues.get(queue).ok_or_else(|| StorageError::QueueNotFound {
            queue: queue.to_string(),
        })?;
        Ok(state.message_count())
    }

    fn max_message_size(&self) -> usize {
        self.max_message_size
    }
}

// ============================================================================
// InMemoryBlobService
// ============================================================================

/// In-memory blob service implementation
#[derive(Debug, Default)]
pub struct InMemoryBlobService {
    containers: RwLock<HashMap<String, HashMap<String, Bytes>>>,
}

impl InMemoryBlobService {
    /// Create new in-memory blob service
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, HashMap<String, Bytes>>> {
        self.containers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, HashMap<String, Bytes>>> {
        self.containers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl BlobService for InMemoryBlobService {
    async fn create_container(&self, container: &str) -> Result<(), StorageError> {
        let mut containers = self.write();
        containers.entry(container.to_string()).or_default();
        Ok(())
    }

    async fn upload_blob(
        &self,
        container: &str,
        blob: &str,
        body: Bytes,
    ) -> Result<(), StorageError> {
        let mut containers = self.write();
        let blobs = containers
            .get_mut(container)
            .ok_or_else(|| StorageError::ContainerNotFound {
                container: container.to_string(),
            })?;
        blobs.insert(blob.to_string(), body);
        Ok(())
    }

    async fn download_blob(
        &self,
        container: &str,
        blob: &str,
    ) -> Result<Option<Bytes>, StorageError> {
        let containers = self.read();
        Ok(containers
            .get(container)
            .and_then(|blobs| blobs.get(blob))
            .cloned())
    }

    async fn blob_exists(&self, container: &str, blob: &str) -> Result<bool, StorageError> {
        let containers = self.read();
        Ok(containers
            .get(container)
            .map(|blobs| blobs.contains_key(blob))
            .unwrap_or(false))
    }

    async fn delete_blob(&self, container: &str, blob: &str) -> Result<bool, StorageError> {
        let mut containers = self.write();
        Ok(containers
            .get_mut(container)
            .map(|blobs| blobs.remove(blob).is_some())
            .unwrap_or(false))
    }

    async fn list_blobs(
        &self,
        container: &str,
        prefix: &str,
    ) -> Result<Vec<String>, StorageError> {
        let containers = self.read();
        let mut names: Vec<String> = containers
            .get(container)
            .map(|blobs| {
                blobs
                    .keys()
                    .filter(|name| name.starts_with(prefix))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        Ok(names)
    }
}
