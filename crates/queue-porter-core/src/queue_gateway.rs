//! Thin wrapper over the queue primitives.
//!
//! The gateway applies two policies the provider relies on everywhere: a
//! missing queue reads as merely empty (empty receive, zero count, no-op
//! clear, false delete), and a missing queue on enqueue is created lazily
//! with the enqueue retried through the settling window. Treating missing
//! queues as empty keeps drain logic idempotent.

use crate::observer::{NoOpObserver, StorageObserver};
use crate::retry::{await_provisioned, RetryPolicy};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use storage_runtime::{PopReceipt, QueueName, QueueService, RawMessage, StorageError};
use tracing::debug;

/// Queue access with not-found and lazy-creation policies applied
pub struct QueueGateway {
    service: Arc<dyn QueueService>,
    retry: RetryPolicy,
    visibility_timeout: Duration,
    observer: Arc<dyn StorageObserver>,
}

impl QueueGateway {
    /// Create new gateway over a queue service
    pub fn new(
        service: Arc<dyn QueueService>,
        retry: RetryPolicy,
        visibility_timeout: Duration,
    ) -> Self {
        Self {
            service,
            retry,
            visibility_timeout,
            observer: Arc::new(NoOpObserver),
        }
    }

    /// Report settling-window retries through `observer`
    pub fn with_observer(mut self, observer: Arc<dyn StorageObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Largest payload the underlying service accepts
    pub fn max_message_size(&self) -> usize {
        self.service.max_message_size()
    }

    /// List queue names starting with `prefix`
    pub async fn list(&self, prefix: &str) -> Result<Vec<QueueName>, StorageError> {
        self.service.list_queues(prefix).await
    }

    /// Enqueue a payload, creating the queue on demand
    pub async fn enqueue(&self, queue: &QueueName, body: Bytes) -> Result<(), StorageError> {
        match self.service.put_message(queue, body.clone()).await {
            Err(error) if error.is_not_found() => {
                debug!(queue = %queue, "queue missing on enqueue, creating it");
                self.service.create_queue(queue).await?;
                await_provisioned(&self.retry, self.observer.as_ref(), "put_message", || {
                    self.service.put_message(queue, body.clone())
                })
                .await
            }
            other => other,
        }
    }

    /// Receive up to `max_messages` raw messages; a missing queue is empty
    pub async fn receive(
        &self,
        queue: &QueueName,
        max_messages: u32,
    ) -> Result<Vec<RawMessage>, StorageError> {
        match self
            .service
            .get_messages(queue, max_messages, self.visibility_timeout)
            .await
        {
            Ok(messages) => Ok(messages),
            Err(error) if error.is_not_found() => Ok(Vec::new()),
            Err(error) => Err(error),
        }
    }

    /// Acknowledge one delivery
    pub async fn ack(&self, queue: &QueueName, receipt: &PopReceipt) -> Result<(), StorageError> {
        self.service.delete_message(queue, receipt).await
    }

    /// Remove all messages; a missing queue is a no-op
    pub async fn clear(&self, queue: &QueueName) -> Result<(), StorageError> {
        match self.service.clear_messages(queue).await {
            Ok(()) => Ok(()),
            Err(error) if error.is_not_found() => Ok(()),
            Err(error) => Err(error),
        }
    }

    /// Delete a queue; returns false when it did not exist
    pub async fn delete_queue(&self, queue: &QueueName) -> Result<bool, StorageError> {
        match self.service.delete_queue(queue).await {
            Ok(()) => Ok(true),
            Err(error) if error.is_not_found() => Ok(false),
            Err(error) => Err(error),
        }
    }

    /// Approximate message count; a missing queue counts zero
    pub async fn approximate_count(&self, queue: &QueueName) -> Result<u64, StorageError> {
        match self.service.approximate_message_count(queue).await {
            Ok(count) => Ok(count),
            Err(error) if error.is_not_found() => Ok(0),
            Err(error) => Err(error),
        }
    }
}

#[cfg(test)]
#[path = "queue_gateway_tests.rs"]
mod tests;
