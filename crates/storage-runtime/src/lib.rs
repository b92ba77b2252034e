//! # Storage Runtime
//!
//! Provider-agnostic runtime for cloud queue and blob storage with support
//! for Azure Storage and in-memory implementations.
//!
//! This library provides:
//! - Validated domain identifiers for queues and messages
//! - The [`QueueService`] and [`BlobService`] primitives exposed by a
//!   storage account
//! - A consistent [`StorageError`] taxonomy with transient/not-found
//!   classification for retry logic
//! - An Azure Storage REST provider (Shared Key authorization) and a fully
//!   functional in-memory provider for tests and development
//!
//! Higher layers (gateways, overflow routing, in-flight tracking) live in
//! `queue-porter-core` and consume this crate through trait objects.

pub mod error;
pub mod message;
pub mod providers;
pub mod service;

pub use error::{StorageError, ValidationError};
pub use message::{PopReceipt, QueueName, RawMessage};
pub use providers::{
    AzureBlobService, AzureQueueService, AzureStorageConfig, InMemoryBlobService,
    InMemoryQueueService,
};
pub use service::{BlobService, QueueService};
