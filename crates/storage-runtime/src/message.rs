//! Domain identifiers and raw message types shared by every provider.

use crate::error::ValidationError;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Validated queue name following the common cloud naming rules
///
/// Names are 3-63 characters of lowercase ASCII alphanumerics and interior
/// hyphens; no leading/trailing hyphen and no consecutive hyphens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueName(String);

impl QueueName {
    /// Create new queue name with validation
    pub fn new(name: String) -> Result<Self, ValidationError> {
        if name.len() < 3 || name.len() > 63 {
            return Err(ValidationError::OutOfRange {
                field: "queue_name".to_string(),
                message: "must be 3-63 characters".to_string(),
            });
        }

        if !name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(ValidationError::InvalidFormat {
                field: "queue_name".to_string(),
                message: "only lowercase ASCII alphanumeric and hyphens allowed".to_string(),
            });
        }

        if name.starts_with('-') || name.ends_with('-') || name.contains("--") {
            return Err(ValidationError::InvalidFormat {
                field: "queue_name".to_string(),
                message: "no leading/trailing hyphens or consecutive hyphens".to_string(),
            });
        }

        Ok(Self(name))
    }

    /// Create queue name with prefix
    pub fn with_prefix(prefix: &str, base_name: &str) -> Result<Self, ValidationError> {
        Self::new(format!("{}-{}", prefix, base_name))
    }

    /// Get queue name as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueueName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for QueueName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

/// Opaque acknowledgement token for one delivery of one message
///
/// The queue service issues a fresh receipt every time a message is
/// delivered; acknowledging (deleting) that delivery requires both the
/// message id and the receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopReceipt {
    message_id: String,
    receipt: String,
}

impl PopReceipt {
    /// Create new pop receipt
    pub fn new(message_id: impl Into<String>, receipt: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            receipt: receipt.into(),
        }
    }

    /// Get the message id this receipt belongs to
    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    /// Get the receipt token
    pub fn receipt(&self) -> &str {
        &self.receipt
    }
}

impl fmt::Display for PopReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.message_id, self.receipt)
    }
}

/// A message as delivered by the queue service, before any decoding
#[derive(Debug, Clone)]
pub struct RawMessage {
    /// Token required to acknowledge this delivery
    pub receipt: PopReceipt,

    /// Raw payload bytes
    pub body: Bytes,

    /// How many times this message has been delivered
    pub dequeue_count: u32,
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
