//! Error types for queue and blob storage operations.

use std::time::Duration;
use thiserror::Error;

/// Comprehensive error type for all storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Queue not found: {queue}")]
    QueueNotFound { queue: String },

    #[error("Container not found: {container}")]
    ContainerNotFound { container: String },

    #[error("Blob not found: {container}/{blob}")]
    BlobNotFound { container: String, blob: String },

    #[error("Receipt rejected for message {message_id}: {reason}")]
    ReceiptRejected { message_id: String, reason: String },

    #[error("Resource '{resource}' is still settling: {message}")]
    ResourceBusy { resource: String, message: String },

    #[error("Message too large: {size} bytes (max: {max_size})")]
    MessageTooLarge { size: usize, max_size: usize },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Malformed service response: {message}")]
    InvalidResponse { message: String },

    #[error("Service error ({code}): {message}")]
    ServiceError { code: String, message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl StorageError {
    /// Check if the error reports a missing queue, container, or blob
    ///
    /// Callers use this to decide between benign empty/zero results and the
    /// lazy create-and-retry path on writes.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::QueueNotFound { .. } | Self::ContainerNotFound { .. } | Self::BlobNotFound { .. }
        )
    }

    /// Check if the error is transient and worth retrying
    pub fn is_transient(&self) -> bool {
        match self {
            Self::QueueNotFound { .. } => false,
            Self::ContainerNotFound { .. } => false,
            Self::BlobNotFound { .. } => false,
            Self::ReceiptRejected { .. } => false,
            Self::ResourceBusy { .. } => true,
            Self::MessageTooLarge { .. } => false,
            Self::AuthenticationFailed { .. } => false,
            Self::ConnectionFailed { .. } => true,
            Self::Timeout { .. } => true,
            Self::InvalidResponse { .. } => false,
            // Service-side errors (throttling, internal errors) are usually transient
            Self::ServiceError { .. } => true,
            Self::Configuration { .. } => false,
            Self::Validation(_) => false,
        }
    }

    /// Get suggested retry delay
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::ResourceBusy { .. } => Some(Duration::from_secs(5)),
            Self::ConnectionFailed { .. } => Some(Duration::from_secs(5)),
            Self::Timeout { .. } => Some(Duration::from_secs(1)),
            _ => None,
        }
    }
}

/// Errors for domain identifier validation
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    Required { field: String },

    #[error("Invalid format for {field}: {message}")]
    InvalidFormat { field: String, message: String },

    #[error("Value out of range for {field}: {message}")]
    OutOfRange { field: String, message: String },
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
