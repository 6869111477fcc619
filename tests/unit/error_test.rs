//! Tests for error types

use prometheus_timed_queue::core::QueueError;

#[test]
fn test_invalid_config_error() {
    let err = QueueError::InvalidConfig("pass_interval_ms must be greater than 0".to_string());
    assert_eq!(
        format!("{}", err),
        "invalid config: pass_interval_ms must be greater than 0"
    );
}
