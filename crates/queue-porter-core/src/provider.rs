//! The queue storage provider.
//!
//! Orchestrates the serializer, queue gateway, overflow store, and
//! in-flight registry into the public queue operations. One provider
//! instance is safe to share across worker threads: the registry is the
//! only mutable shared state and its lock is never held across storage
//! calls.
//!
//! ## Message flow
//!
//! - `put` serializes the message; payloads at or above the effective size
//!   limit are uploaded to the overflow container and replaced on the queue
//!   by a reference record.
//! - `get` receives raw messages, registers every delivery as in-flight,
//!   then resolves overflow references outside the registry lock. A
//!   reference whose blob was swept is a stranded wrapper: its queue
//!   message is acknowledged and it is dropped from the batch.
//! - `delete` looks up the oldest raw handle for the message value,
//!   removes the overflow blob when there is one, acknowledges the
//!   delivery, and pops the handle. Handles invalidated behind our back
//!   (cleared or deleted queues) still drop their registry entry and
//!   report `false`.

use crate::config::ProviderConfig;
use crate::inflight::InFlightRegistry;
use crate::observer::{NoOpObserver, StorageObserver};
use crate::overflow::OverflowStore;
use crate::queue_gateway::QueueGateway;
use crate::serializer::{OverflowReference, Payload, Serializer};
use crate::{PorterError, PorterResult};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use storage_runtime::{BlobService, QueueName, QueueService, RawMessage, StorageError};
use tracing::{debug, warn};

/// Cloud work-queue client with transparent blob overflow
pub struct QueueStorageProvider {
    gateway: QueueGateway,
    overflow: OverflowStore,
    registry: Arc<InFlightRegistry>,
    serializer: Serializer,
    observer: Arc<dyn StorageObserver>,
    config: ProviderConfig,
    max_message_size: usize,
}

impl QueueStorageProvider {
    /// Create new provider over queue and blob services
    ///
    /// The effective overflow threshold is the queue service's payload
    /// hint, optionally lowered by
    /// [`ProviderConfig::max_message_size`].
    pub fn new(
        queue_service: Arc<dyn QueueService>,
        blob_service: Arc<dyn BlobService>,
        config: ProviderConfig,
    ) -> Self {
        let service_limit = queue_service.max_message_size();
        let max_message_size = config
            .max_message_size
            .map(|limit| limit.min(service_limit))
            .unwrap_or(service_limit);

        let gateway = QueueGateway::new(
            queue_service,
            config.retry.clone(),
            config.visibility_timeout,
        );
        let overflow = OverflowStore::new(
            blob_service,
            config.retry.clone(),
            config.overflow_container.clone(),
        );

        Self {
            gateway,
            overflow,
            registry: Arc::new(InFlightRegistry::new()),
            serializer: Serializer::new(),
            observer: Arc::new(NoOpObserver),
            config,
            max_message_size,
        }
    }

    /// Attach an observer for provider events
    ///
    /// The observer also reaches both gateways so settling-window retries
    /// are reported. Providers owned by a logging pipeline must not set
    /// one; the default no-op observer keeps self-observation from
    /// recursing into the pipeline's own queue.
    pub fn with_observer(mut self, observer: Arc<dyn StorageObserver>) -> Self {
        self.gateway = self.gateway.with_observer(observer.clone());
        self.overflow = self.overflow.with_observer(observer.clone());
        self.observer = observer;
        self
    }

    /// Payload size at which messages are routed through the overflow store
    pub fn max_message_size(&self) -> usize {
        self.max_message_size
    }

    /// Number of distinct message values currently in flight
    pub fn in_flight_len(&self) -> usize {
        self.registry.len()
    }

    #[cfg(test)]
    pub(crate) fn registry_handle(&self) -> Arc<InFlightRegistry> {
        Arc::clone(&self.registry)
    }

    /// List queue names starting with `prefix`
    pub async fn list(&self, prefix: &str) -> PorterResult<Vec<QueueName>> {
        Ok(self.gateway.list(prefix).await?)
    }

    /// Receive up to `max_count` messages, registering each as in-flight
    ///
    /// A missing queue yields an empty batch. Overflowed payloads are
    /// fetched from the blob store; wrappers whose blob has been swept are
    /// acknowledged and silently dropped from the batch. Arrival order is
    /// preserved.
    pub async fn get<T>(&self, queue: &QueueName, max_count: u32) -> PorterResult<Vec<T>>
    where
        T: Serialize + DeserializeOwned,
    {
        let limit = max_count.min(self.config.receive_batch_limit);
        let deliveries = self.gateway.receive(queue, limit).await?;
        if deliveries.is_empty() {
            return Ok(Vec::new());
        }

        // Decode and register every delivery before any blob traffic so an
        // early ack cannot race the registry.
        enum Slot<T> {
            Ready(T),
            Unresolved {
                key: Bytes,
                reference: OverflowReference,
                delivery: RawMessage,
            },
        }

        let mut slots: Vec<Slot<T>> = Vec::with_capacity(deliveries.len());
        for delivery in deliveries {
            match self.serializer.deserialize::<T>(&delivery.body)? {
                Payload::Direct(value) => {
                    let key = self.serializer.serialize(&value)?;
                    self.registry.insert_or_append(key, delivery, false);
                    self.observer.message_received(queue, false);
                    slots.push(Slot::Ready(value));
                }
                Payload::Overflow(reference) => {
                    let key = self.serializer.serialize_reference(&reference)?;
                    self.registry
                        .insert_or_append(key.clone(), delivery.clone(), true);
                    self.observer.message_received(queue, true);
                    slots.push(Slot::Unresolved {
                        key,
                        reference,
                        delivery,
                    });
                }
            }
        }

        // Resolve overflow references outside the registry lock.
        let mut messages = Vec::with_capacity(slots.len());
        for slot in slots {
            match slot {
                Slot::Ready(value) => messages.push(value),
                Slot::Unresolved {
                    key,
                    reference,
                    delivery,
                } => match self.overflow.get(&reference).await {
                    Ok(Some(blob)) => match self.serializer.deserialize_value::<T>(&blob) {
                        Ok(value) => {
                            let new_key = self.serializer.serialize(&value)?;
                            self.registry.rekey(&key, new_key);
                            messages.push(value);
                        }
                        Err(error) => {
                            warn!(
                                queue = %queue,
                                blob = %reference.blob_name,
                                error = %error,
                                "overflow payload did not decode, skipping delivery"
                            );
                            self.registry.remove(&key);
                        }
                    },
                    Ok(None) => {
                        // Stranded wrapper: the janitor swept the payload.
                        warn!(
                            queue = %queue,
                            blob = %reference.blob_name,
                            "overflow payload missing, discarding stranded wrapper"
                        );
                        self.observer.wrapper_stranded(queue, &reference.blob_name);
                        if let Err(error) = self.gateway.ack(queue, &delivery.receipt).await {
                            debug!(
                                queue = %queue,
                                error = %error,
                                "failed to ack stranded wrapper; it will expire on its own"
                            );
                        }
                        self.registry.remove(&key);
                    }
                    Err(error) => {
                        warn!(
                            queue = %queue,
                            blob = %reference.blob_name,
                            error = %error,
                            "overflow payload fetch failed, skipping delivery"
                        );
                        self.registry.remove(&key);
                    }
                },
            }
        }

        Ok(messages)
    }

    /// Enqueue one message
    pub async fn put<T: Serialize>(&self, queue: &QueueName, message: &T) -> PorterResult<()> {
        self.put_payload(queue, message).await
    }

    /// Enqueue a batch of messages
    ///
    /// Puts are independent; partial success is not rolled back.
    pub async fn put_range<T: Serialize>(
        &self,
        queue: &QueueName,
        messages: &[T],
    ) -> PorterResult<()> {
        for message in messages {
            self.put_payload(queue, message).await?;
        }
        Ok(())
    }

    async fn put_payload<T: Serialize>(&self, queue: &QueueName, message: &T) -> PorterResult<()> {
        let body = self.serializer.serialize(message)?;

        let overflowed = body.len() >= self.max_message_size;
        let payload = if overflowed {
            let reference = self
                .overflow
                .allocate_reference(queue, self.config.overflow_retention);
            debug!(
                queue = %queue,
                blob = %reference.blob_name,
                size = body.len(),
                "routing oversize message through the overflow store"
            );
            self.overflow.put(&reference, body).await?;
            self.serializer.serialize_reference(&reference)?
        } else {
            body
        };

        self.gateway.enqueue(queue, payload).await?;
        self.observer.message_enqueued(queue, overflowed);
        Ok(())
    }

    /// Acknowledge one delivery of a previously received message
    ///
    /// Returns false when the message is not in flight here, or when its
    /// raw handle has been invalidated behind our back (the registry entry
    /// is dropped either way). Value-identical messages with several
    /// accumulated handles acknowledge one handle per call, in arrival
    /// order.
    pub async fn delete<T: Serialize>(&self, queue: &QueueName, message: &T) -> PorterResult<bool> {
        let key = self.serializer.serialize(message)?;
        self.delete_by_key(queue, &key).await
    }

    /// Acknowledge a batch of messages, returning how many deliveries were
    /// actually acknowledged
    pub async fn delete_range<T: Serialize>(
        &self,
        queue: &QueueName,
        messages: &[T],
    ) -> PorterResult<usize> {
        let mut acked = 0;
        for message in messages {
            if self.delete(queue, message).await? {
                acked += 1;
            }
        }
        Ok(acked)
    }

    async fn delete_by_key(&self, queue: &QueueName, key: &Bytes) -> PorterResult<bool> {
        // Copy the handle out; the storage calls below run without the lock.
        let Some((delivery, overflowing)) = self.registry.front(key) else {
            return Ok(false);
        };

        if overflowing {
            match self.serializer.deserialize_reference(&delivery.body) {
                Ok(reference) => {
                    self.overflow.delete(&reference).await;
                }
                Err(error) => {
                    warn!(
                        queue = %queue,
                        error = %error,
                        "in-flight wrapper bytes did not decode, skipping blob cleanup"
                    );
                }
            }
        }

        match self.gateway.ack(queue, &delivery.receipt).await {
            Ok(()) => {
                self.registry.pop_front(key);
                self.observer.message_acked(queue);
                Ok(true)
            }
            Err(error)
                if error.is_not_found() || matches!(error, StorageError::ReceiptRejected { .. }) =>
            {
                debug!(
                    queue = %queue,
                    error = %error,
                    "ack failed for an orphaned delivery, dropping registry entry"
                );
                self.registry.pop_front(key);
                Ok(false)
            }
            Err(error) => Err(PorterError::Storage(error)),
        }
    }

    /// Remove all messages from a queue; a missing queue is a no-op
    ///
    /// The registry is deliberately untouched: stale entries surface on the
    /// next `delete` as a failed ack and are dropped there.
    pub async fn clear(&self, queue: &QueueName) -> PorterResult<()> {
        Ok(self.gateway.clear(queue).await?)
    }

    /// Delete a queue; returns false when it did not exist
    pub async fn delete_queue(&self, queue: &QueueName) -> PorterResult<bool> {
        Ok(self.gateway.delete_queue(queue).await?)
    }

    /// Approximate message count; a missing queue counts zero
    pub async fn approximate_count(&self, queue: &QueueName) -> PorterResult<u64> {
        Ok(self.gateway.approximate_count(queue).await?)
    }
}

#[cfg(test)]
#[path = "provider_tests.rs"]
mod tests;
