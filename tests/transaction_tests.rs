//! Transaction Tests
//!
//! Single-pending-slot semantics, timeout behavior, dispatch matching,
//! and listener fan-out.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{fixed_str, EP_LOGS, EP_PING};
use wristlink::protocol::{Response, ResponseKind};
use wristlink::transaction::{Completion, TransactionManager};
use wristlink::LinkError;

fn ping_payload(cookie: u32) -> Vec<u8> {
    let mut payload = vec![1u8];
    payload.extend_from_slice(&cookie.to_be_bytes());
    payload
}

fn log_payload(message: &str) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&1_400_000_000u32.to_be_bytes());
    payload.push(1); // level
    payload.push(message.len() as u8);
    payload.extend_from_slice(&42u16.to_be_bytes());
    payload.extend_from_slice(&fixed_str("watch.c", 16));
    payload.extend_from_slice(message.as_bytes());
    payload
}

// =============================================================================
// Pending Slot Tests
// =============================================================================

#[test]
fn test_only_one_transaction_at_a_time() {
    let manager = TransactionManager::new();

    let txn = manager.begin(ResponseKind::Ping).unwrap();
    assert_eq!(txn.expected(), ResponseKind::Ping);
    match manager.begin(ResponseKind::Time) {
        Err(LinkError::TransactionPending) => {}
        other => panic!("expected TransactionPending, got {other:?}"),
    }

    // Releasing the handle frees the slot
    drop(txn);
    assert!(!manager.has_pending());
    manager.begin(ResponseKind::Time).unwrap();
}

#[test]
fn test_slot_frees_after_timeout() {
    let manager = TransactionManager::new();

    let txn = manager.begin(ResponseKind::Ping).unwrap();
    let completion = txn.wait(Duration::from_millis(50));
    assert!(matches!(completion, Completion::TimedOut(_)));

    // The timed-out handle was consumed; a new transaction may open
    manager.begin(ResponseKind::Ping).unwrap();
}

// =============================================================================
// Timeout Tests
// =============================================================================

#[test]
fn test_timeout_returns_failed_response_not_panic() {
    let manager = TransactionManager::new();
    let txn = manager.begin(ResponseKind::Ping).unwrap();

    let start = Instant::now();
    let response = txn.wait(Duration::from_millis(100)).into_response();
    let elapsed = start.elapsed();

    assert!(!response.success());
    assert_eq!(response.error(), Some("timed out"));
    assert_eq!(response.kind(), ResponseKind::Ping);
    assert!(elapsed >= Duration::from_millis(100));
    assert!(elapsed < Duration::from_secs(2), "returned well past the deadline");
}

// =============================================================================
// Dispatch Tests
// =============================================================================

#[test]
fn test_dispatch_completes_matching_transaction() {
    let manager = TransactionManager::new();
    let txn = manager.begin(ResponseKind::Ping).unwrap();

    manager.dispatch(EP_PING, &ping_payload(0xC0FFEE));

    match txn.wait(Duration::from_millis(100)) {
        Completion::Replied(Response::Ping(reply)) => {
            assert!(reply.success);
            assert_eq!(reply.cookie, 0xC0FFEE);
        }
        other => panic!("expected ping reply, got {other:?}"),
    }
}

#[test]
fn test_mismatched_kind_does_not_complete() {
    let manager = TransactionManager::new();
    let txn = manager.begin(ResponseKind::Time).unwrap();

    // A ping response arrives while we wait for time
    manager.dispatch(EP_PING, &ping_payload(7));

    let completion = txn.wait(Duration::from_millis(50));
    assert!(matches!(completion, Completion::TimedOut(_)));
}

#[test]
fn test_listeners_fire_alongside_completion() {
    let manager = TransactionManager::new();

    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    manager.subscribe(ResponseKind::Ping, move |response| {
        assert!(response.success());
        counter.fetch_add(1, Ordering::SeqCst);
    });

    // Completing a transaction does not consume the listener delivery
    let txn = manager.begin(ResponseKind::Ping).unwrap();
    manager.dispatch(EP_PING, &ping_payload(1));
    assert!(matches!(
        txn.wait(Duration::from_millis(100)),
        Completion::Replied(_)
    ));
    assert_eq!(seen.load(Ordering::SeqCst), 1);

    // And fires without any transaction too
    manager.dispatch(EP_PING, &ping_payload(2));
    assert_eq!(seen.load(Ordering::SeqCst), 2);
}

#[test]
fn test_unsubscribe_stops_delivery() {
    let manager = TransactionManager::new();

    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    let id = manager.subscribe(ResponseKind::Ping, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    manager.dispatch(EP_PING, &ping_payload(1));
    manager.unsubscribe(id);
    manager.dispatch(EP_PING, &ping_payload(2));

    assert_eq!(seen.load(Ordering::SeqCst), 1);
}

// =============================================================================
// Log Channel Preemption Tests
// =============================================================================

#[test]
fn test_log_channel_preempts_pending_transaction() {
    let manager = TransactionManager::new();
    let txn = manager.begin(ResponseKind::Ping).unwrap();

    manager.dispatch(EP_LOGS, &log_payload("assertion failed"));

    match txn.wait(Duration::from_millis(100)) {
        Completion::Replied(response) => {
            assert!(!response.success());
            assert_eq!(response.kind(), ResponseKind::Ping);
            let error = response.error().expect("carries the device error");
            assert!(error.contains("assertion failed"));
            assert!(error.contains("watch.c"));
        }
        other => panic!("expected preempted reply, got {other:?}"),
    }
}

#[test]
fn test_log_without_pending_goes_to_listeners() {
    let manager = TransactionManager::new();

    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    manager.subscribe(ResponseKind::Log, move |response| {
        match response {
            Response::Log(log) => assert_eq!(log.log.message, "just chatter"),
            other => panic!("expected Log, got {other:?}"),
        }
        counter.fetch_add(1, Ordering::SeqCst);
    });

    manager.dispatch(EP_LOGS, &log_payload("just chatter"));
    assert_eq!(seen.load(Ordering::SeqCst), 1);
}
