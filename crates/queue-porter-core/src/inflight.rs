//! Registry of received-but-unacknowledged messages.
//!
//! Acknowledgement is value-addressed: callers hand back the message they
//! received, and the registry maps its canonical serialized form to the raw
//! handles issued by the queue service. Two value-identical receives share
//! one record and accumulate handles; `delete` consumes them one at a time
//! in arrival order.
//!
//! The lock protects only in-memory state. No network call happens while it
//! is held — callers copy values out of the critical section first.

use bytes::Bytes;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use storage_runtime::RawMessage;

/// One record per in-flight message value
#[derive(Debug)]
struct InFlightRecord {
    /// Raw deliveries awaiting acknowledgement, in arrival order
    deliveries: VecDeque<RawMessage>,

    /// Whether the deliveries carry overflow references; immutable for the
    /// life of the record
    overflowing: bool,
}

/// Concurrency-safe map from message values to their raw handles
#[derive(Debug, Default)]
pub struct InFlightRegistry {
    records: Mutex<HashMap<Bytes, InFlightRecord>>,
}

impl InFlightRegistry {
    /// Create new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Bytes, InFlightRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a delivery: create a record for a new key, append the
    /// handle for a known one (the existing record's overflow flag wins)
    pub fn insert_or_append(&self, key: Bytes, delivery: RawMessage, overflowing: bool) {
        let mut records = self.lock();
        match records.entry(key) {
            Entry::Occupied(mut entry) => entry.get_mut().deliveries.push_back(delivery),
            Entry::Vacant(entry) => {
                entry.insert(InFlightRecord {
                    deliveries: VecDeque::from([delivery]),
                    overflowing,
                });
            }
        }
    }

    /// Atomically move a record to a new key
    ///
    /// Used when an overflow wrapper is resolved to its underlying message.
    /// If the new key already has a record, the deliveries are appended to
    /// it.
    pub fn rekey(&self, old_key: &[u8], new_key: Bytes) {
        let mut records = self.lock();
        if let Some(record) = records.remove(old_key) {
            match records.entry(new_key) {
                Entry::Occupied(mut entry) => {
                    entry.get_mut().deliveries.extend(record.deliveries);
                }
                Entry::Vacant(entry) => {
                    entry.insert(record);
                }
            }
        }
    }

    /// Copy out the oldest delivery for a key, with the overflow flag
    pub fn front(&self, key: &[u8]) -> Option<(RawMessage, bool)> {
        let records = self.lock();
        let record = records.get(key)?;
        record
            .deliveries
            .front()
            .map(|delivery| (delivery.clone(), record.overflowing))
    }

    /// Drop the oldest delivery for a key; the record disappears with its
    /// last delivery
    pub fn pop_front(&self, key: &[u8]) -> Option<RawMessage> {
        let mut records = self.lock();
        let record = records.get_mut(key)?;
        let delivery = record.deliveries.pop_front();
        if record.deliveries.is_empty() {
            records.remove(key);
        }
        delivery
    }

    /// Drop a whole record; returns false when the key was absent
    pub fn remove(&self, key: &[u8]) -> bool {
        self.lock().remove(key).is_some()
    }

    /// Number of distinct in-flight message values
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing is in flight
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Probe whether the registry lock is currently free
    ///
    /// Instrumented service doubles use this to verify no storage call runs
    /// inside the critical section.
    pub fn is_unlocked(&self) -> bool {
        self.records.try_lock().is_ok()
    }
}

#[cfg(test)]
#[path = "inflight_tests.rs"]
mod tests;
