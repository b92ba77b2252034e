//! # Queue Porter Core
//!
//! Cloud-backed work-queue client with transparent blob overflow.
//!
//! Worker processes exchange serialized messages through a hosted queue
//! service; payloads too large for a queue message are off-loaded to a
//! companion blob store and replaced on the queue by a small reference
//! record. The [`QueueStorageProvider`] orchestrates the pieces:
//!
//! - [`serializer::Serializer`] encodes messages and distinguishes direct
//!   payloads from overflow references on the wire
//! - [`overflow::OverflowStore`] hosts oversize payloads under
//!   date-prefixed names so a janitor can sweep expired ones
//! - [`queue_gateway::QueueGateway`] wraps the queue primitives with the
//!   not-found and lazy-creation policies
//! - [`inflight::InFlightRegistry`] maps received message values to the
//!   raw handles needed for acknowledgement
//! - [`retry::RetryPolicy`] bounds the settling window after a queue or
//!   container is freshly created
//!
//! ## Architecture
//!
//! The core depends only on the `storage-runtime` trait abstractions;
//! concrete providers (Azure, in-memory) are injected at construction. One
//! provider instance is intended to be shared across worker threads.
//!
//! ## Usage
//!
//! ```
//! use queue_porter_core::{ProviderConfig, QueueStorageProvider};
//! use storage_runtime::{InMemoryBlobService, InMemoryQueueService, QueueName};
//! use std::sync::Arc;
//!
//! # async fn example() -> queue_porter_core::PorterResult<()> {
//! let provider = QueueStorageProvider::new(
//!     Arc::new(InMemoryQueueService::new()),
//!     Arc::new(InMemoryBlobService::new()),
//!     ProviderConfig::default(),
//! );
//!
//! let queue: QueueName = "work-items".parse()?;
//! provider.put(&queue, &"hello".to_string()).await?;
//! let received: Vec<String> = provider.get(&queue, 10).await?;
//! # let _ = received;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use serializer::PayloadError;
use storage_runtime::StorageError;
use thiserror::Error;

pub mod config;
pub mod inflight;
pub mod observer;
pub mod overflow;
pub mod provider;
pub mod queue_gateway;
pub mod retry;
pub mod serializer;
pub mod service_state;

pub use config::ProviderConfig;
pub use inflight::InFlightRegistry;
pub use observer::{NoOpObserver, StorageObserver};
pub use overflow::OverflowStore;
pub use provider::QueueStorageProvider;
pub use queue_gateway::QueueGateway;
pub use retry::RetryPolicy;
pub use serializer::{OverflowReference, Payload, Serializer};
pub use service_state::{ServiceState, ServiceStateRegistry};

// Re-export the runtime types callers need to wire a provider
pub use storage_runtime::{BlobService, QueueName, QueueService, StorageError as RuntimeError};

/// Standard result type for queue-porter operations
pub type PorterResult<T> = Result<T, PorterError>;

// ============================================================================
// Boundary Constants
// ============================================================================

/// Fixed container hosting overflow payloads; shared with the janitor sweep
pub const OVERFLOW_CONTAINER: &str = "queue-porter-overflow";

/// Container hosting control-plane blobs such as service-state flags
pub const CONTROL_CONTAINER: &str = "queue-porter-control";

/// Maximum in-flight lifetime; encoded into overflow blob name prefixes so
/// blobs older than this can be swept
pub const OVERFLOW_RETENTION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

// ============================================================================
// Error Types
// ============================================================================

/// Top-level error type for queue-porter operations
#[derive(Debug, Error)]
pub enum PorterError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Payload error: {0}")]
    Payload(#[from] PayloadError),

    #[error("Validation error: {0}")]
    Validation(#[from] storage_runtime::ValidationError),
}

impl PorterError {
    /// Check if the error is transient and worth retrying
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Storage(error) => error.is_transient(),
            Self::Payload(_) => false,
            Self::Validation(_) => false,
        }
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
