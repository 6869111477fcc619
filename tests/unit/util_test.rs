//! Tests for utility functions

use std::time::{Duration, UNIX_EPOCH};

use prometheus_timed_queue::util::{init_tracing, millis_since_epoch, Clock, ManualClock};

#[test]
fn test_manual_clock_advance() {
    let clock = ManualClock::at_epoch();
    clock.advance(Duration::from_millis(1500));
    assert_eq!(millis_since_epoch(clock.now()), 1500);
}

#[test]
fn test_millis_before_epoch_is_zero() {
    let before = UNIX_EPOCH - Duration::from_secs(1);
    assert_eq!(millis_since_epoch(before), 0);
}

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing();
    init_tracing();
}
