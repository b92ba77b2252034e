//! Storage provider implementations.

pub mod azure;
pub mod memory;

pub use azure::{AzureBlobService, AzureQueueService, AzureStorageConfig};
pub use memory::{InMemoryBlobService, InMemoryQueueService};
