//! Observation hooks for provider operations.
//!
//! The provider reports noteworthy events through this trait so callers can
//! wire metrics or auditing without the core depending on either. All hooks
//! are best-effort: implementations must not fail and must not call back
//! into the provider that invoked them. In particular, a provider that
//! backs a logging pipeline is constructed with [`NoOpObserver`] so
//! observing its own traffic cannot recurse into its own queue.

use storage_runtime::QueueName;

/// Best-effort observer of provider operations
///
/// All methods have no-op defaults; implement only what you need.
pub trait StorageObserver: Send + Sync {
    /// A message was enqueued, possibly through the overflow store
    fn message_enqueued(&self, _queue: &QueueName, _overflowed: bool) {}

    /// A message was received and registered as in-flight
    fn message_received(&self, _queue: &QueueName, _overflowed: bool) {}

    /// One delivery was acknowledged
    fn message_acked(&self, _queue: &QueueName) {}

    /// A wrapper pointed at a swept blob and was dropped from the batch
    fn wrapper_stranded(&self, _queue: &QueueName, _blob_name: &str) {}

    /// A settling-window retry was scheduled for a storage operation
    fn retry_scheduled(&self, _operation: &str, _attempt: u32) {}
}

/// Observer that ignores every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpObserver;

impl StorageObserver for NoOpObserver {}
