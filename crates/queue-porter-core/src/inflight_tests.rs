//! Tests for the in-flight registry.

use super::*;
use storage_runtime::PopReceipt;

fn delivery(id: &str) -> RawMessage {
    RawMessage {
        receipt: PopReceipt::new(id, format!("receipt-{}", id)),
        body: Bytes::from_static(b"body"),
        dequeue_count: 1,
    }
}

fn key(value: &str) -> Bytes {
    Bytes::copy_from_slice(value.as_bytes())
}

#[test]
fn test_insert_creates_record() {
    let registry = InFlightRegistry::new();

    registry.insert_or_append(key("m1"), delivery("d1"), false);

    let (front, overflowing) = registry.front(b"m1").unwrap();
    assert_eq!(front.receipt.message_id(), "d1");
    assert!(!overflowing);
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_value_identical_receive_appends_handle() {
    let registry = InFlightRegistry::new();

    registry.insert_or_append(key("m1"), delivery("d1"), false);
    registry.insert_or_append(key("m1"), delivery("d2"), false);

    // One record, two handles, arrival order preserved
    assert_eq!(registry.len(), 1);
    let (front, _) = registry.front(b"m1").unwrap();
    assert_eq!(front.receipt.message_id(), "d1");
}

#[test]
fn test_existing_overflow_flag_wins_on_append() {
    let registry = InFlightRegistry::new();

    registry.insert_or_append(key("m1"), delivery("d1"), true);
    registry.insert_or_append(key("m1"), delivery("d2"), false);

    let (_, overflowing) = registry.front(b"m1").unwrap();
    assert!(overflowing);
}

#[test]
fn test_pop_front_consumes_in_arrival_order() {
    let registry = InFlightRegistry::new();
    registry.insert_or_append(key("m1"), delivery("d1"), false);
    registry.insert_or_append(key("m1"), delivery("d2"), false);

    let first = registry.pop_front(b"m1").unwrap();
    assert_eq!(first.receipt.message_id(), "d1");
    assert_eq!(registry.len(), 1);

    let second = registry.pop_front(b"m1").unwrap();
    assert_eq!(second.receipt.message_id(), "d2");

    // Record disappears with its last delivery
    assert!(registry.is_empty());
    assert!(registry.pop_front(b"m1").is_none());
}

#[test]
fn test_front_on_absent_key_is_none() {
    let registry = InFlightRegistry::new();
    assert!(registry.front(b"ghost").is_none());
}

#[test]
fn test_rekey_moves_record() {
    let registry = InFlightRegistry::new();
    registry.insert_or_append(key("wrapper"), delivery("d1"), true);

    registry.rekey(b"wrapper", key("resolved"));

    assert!(registry.front(b"wrapper").is_none());
    let (front, overflowing) = registry.front(b"resolved").unwrap();
    assert_eq!(front.receipt.message_id(), "d1");
    assert!(overflowing);
}

#[test]
fn test_rekey_into_existing_record_appends() {
    let registry = InFlightRegistry::new();
    registry.insert_or_append(key("resolved"), delivery("d1"), true);
    registry.insert_or_append(key("wrapper"), delivery("d2"), true);

    registry.rekey(b"wrapper", key("resolved"));

    assert_eq!(registry.len(), 1);
    assert_eq!(registry.pop_front(b"resolved").unwrap().receipt.message_id(), "d1");
    assert_eq!(registry.pop_front(b"resolved").unwrap().receipt.message_id(), "d2");
}

#[test]
fn test_rekey_absent_key_is_noop() {
    let registry = InFlightRegistry::new();
    registry.rekey(b"ghost", key("resolved"));
    assert!(registry.is_empty());
}

#[test]
fn test_remove_drops_whole_record() {
    let registry = InFlightRegistry::new();
    registry.insert_or_append(key("m1"), delivery("d1"), false);
    registry.insert_or_append(key("m1"), delivery("d2"), false);

    assert!(registry.remove(b"m1"));
    assert!(registry.is_empty());
    assert!(!registry.remove(b"m1"));
}

#[test]
fn test_lock_probe_reports_free_lock() {
    let registry = InFlightRegistry::new();
    assert!(registry.is_unlocked());
}
