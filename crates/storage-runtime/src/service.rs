//! Service traits for the raw queue and blob storage primitives.
//!
//! These traits are the seam between the queue-porter core and a storage
//! account: implementations translate each primitive into provider calls and
//! surface missing resources as distinguishable [`StorageError`] variants so
//! higher layers can run their not-found and lazy-creation policies.

use crate::error::StorageError;
use crate::message::{PopReceipt, QueueName, RawMessage};
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

/// Primitive operations of a hosted queue service
#[async_trait]
pub trait QueueService: Send + Sync {
    /// Create a queue; creating an existing queue is not an error
    async fn create_queue(&self, queue: &QueueName) -> Result<(), StorageError>;

    /// Delete a queue and all of its messages
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::QueueNotFound`] when the queue does not exist.
    async fn delete_queue(&self, queue: &QueueName) -> Result<(), StorageError>;

    /// List queue names starting with `prefix`
    async fn list_queues(&self, prefix: &str) -> Result<Vec<QueueName>, StorageError>;

    /// Enqueue a message body
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::QueueNotFound`] when the queue does not exist
    /// and [`StorageError::MessageTooLarge`] when the body exceeds
    /// [`QueueService::max_message_size`].
    async fn put_message(&self, queue: &QueueName, body: Bytes) -> Result<(), StorageError>;

    /// Dequeue up to `max_messages` messages, hiding them for
    /// `visibility_timeout`
    ///
    /// Messages that are not deleted before the visibility timeout expires
    /// become available for delivery again, invalidating the receipt handed
    /// out here.
    async fn get_messages(
        &self,
        queue: &QueueName,
        max_messages: u32,
        visibility_timeout: Duration,
    ) -> Result<Vec<RawMessage>, StorageError>;

    /// Acknowledge one delivery, removing the message
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ReceiptRejected`] when the receipt is no
    /// longer valid (redelivered, cleared, or already deleted).
    async fn delete_message(
        &self,
        queue: &QueueName,
        receipt: &PopReceipt,
    ) -> Result<(), StorageError>;

    /// Remove all messages from a queue without deleting the queue
    async fn clear_messages(&self, queue: &QueueName) -> Result<(), StorageError>;

    /// Approximate number of messages, including invisible ones
    async fn approximate_message_count(&self, queue: &QueueName) -> Result<u64, StorageError>;

    /// Largest body accepted by [`QueueService::put_message`], in bytes
    fn max_message_size(&self) -> usize;
}

/// Primitive operations of a hosted blob store
#[async_trait]
pub trait BlobService: Send + Sync {
    /// Create a container; creating an existing container is not an error
    async fn create_container(&self, container: &str) -> Result<(), StorageError>;

    /// Upload a blob, overwriting any previous content
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ContainerNotFound`] when the container does
    /// not exist.
    async fn upload_blob(
        &self,
        container: &str,
        blob: &str,
        body: Bytes,
    ) -> Result<(), StorageError>;

    /// Download a blob; absence (of the blob or its container) is `None`,
    /// not an error
    async fn download_blob(
        &self,
        container: &str,
        blob: &str,
    ) -> Result<Option<Bytes>, StorageError>;

    /// Check blob existence without downloading it
    async fn blob_exists(&self, container: &str, blob: &str) -> Result<bool, StorageError>;

    /// Delete a blob; returns false when it did not exist
    async fn delete_blob(&self, container: &str, blob: &str) -> Result<bool, StorageError>;

    /// List blob names starting with `prefix`; a missing container lists as
    /// empty
    async fn list_blobs(&self, container: &str, prefix: &str)
        -> Result<Vec<String>, StorageError>;
}
