//! Tests for builders

use std::collections::HashMap;
use std::sync::Arc;

use prometheus_timed_queue::builders::{build_limiter, build_queue, build_queues};
use prometheus_timed_queue::config::{LimiterConfig, QueueConfig, QueueSetConfig};
use prometheus_timed_queue::core::{QueueError, RateLimiter};
use prometheus_timed_queue::util::clock::{Clock, ManualClock};

fn clock() -> Arc<dyn Clock> {
    Arc::new(ManualClock::at_epoch())
}

#[test]
fn test_build_queue_from_config() {
    let cfg = QueueConfig {
        leak: true,
        limiter: LimiterConfig::TokenBucket { qps: 10.0, burst: 2 },
        pass_interval_ms: 50,
    };
    let queue = build_queue(&cfg, clock()).unwrap();
    assert!(queue.leaks());
    assert!(queue.add("node-1"));
}

#[test]
fn test_build_never_limiter_refuses() {
    let limiter = build_limiter(&LimiterConfig::Never).unwrap();
    assert!(!limiter.can_accept());
    assert!((limiter.saturation() - 1.0).abs() < f64::EPSILON);
}

#[test]
fn test_build_limiter_rejects_invalid_config() {
    let result = build_limiter(&LimiterConfig::TokenBucket { qps: -1.0, burst: 1 });
    assert!(matches!(result, Err(QueueError::InvalidConfig(_))));
}

#[test]
fn test_build_queues_shares_clock() {
    let mut queues = HashMap::new();
    queues.insert("zone-a".to_string(), QueueConfig::unlimited());
    queues.insert("zone-b".to_string(), QueueConfig::unlimited());

    let built = build_queues(&QueueSetConfig { queues }, &clock()).unwrap();
    assert_eq!(built.len(), 2);
    assert!(built["zone-a"].add("node-1"));
    assert!(built["zone-b"].add("node-1"));
}

#[test]
fn test_build_queues_rejects_empty_set() {
    let result = build_queues(
        &QueueSetConfig {
            queues: HashMap::new(),
        },
        &clock(),
    );
    assert!(matches!(result, Err(QueueError::InvalidConfig(_))));
}
