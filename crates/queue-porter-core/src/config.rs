//! Configuration for the queue storage provider.

use crate::retry::RetryPolicy;
use crate::{OVERFLOW_CONTAINER, OVERFLOW_RETENTION};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for [`QueueStorageProvider`](crate::QueueStorageProvider)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Container hosting overflow payloads
    pub overflow_container: String,

    /// Override for the payload size at which messages overflow; the
    /// effective limit never exceeds the queue service's own hint
    pub max_message_size: Option<usize>,

    /// Lifetime encoded into overflow blob names for the janitor sweep
    pub overflow_retention: Duration,

    /// How long received messages stay invisible before redelivery
    pub visibility_timeout: Duration,

    /// Upper bound on messages fetched per receive call
    pub receive_batch_limit: u32,

    /// Backoff applied in the settling window after creating a queue or
    /// container
    pub retry: RetryPolicy,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            overflow_container: OVERFLOW_CONTAINER.to_string(),
            max_message_size: None,
            overflow_retention: OVERFLOW_RETENTION,
            visibility_timeout: Duration::from_secs(30),
            receive_batch_limit: 32,
            retry: RetryPolicy::default(),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
