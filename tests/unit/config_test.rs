//! Tests for configuration validation

use prometheus_timed_queue::config::{LimiterConfig, QueueConfig, QueueSetConfig};

fn token_bucket(qps: f64, burst: u32) -> QueueConfig {
    QueueConfig {
        leak: true,
        limiter: LimiterConfig::TokenBucket { qps, burst },
        pass_interval_ms: 100,
    }
}

#[test]
fn test_queue_config_validation() {
    assert!(token_bucket(0.1, 1).validate().is_ok());
    assert!(QueueConfig::unlimited().validate().is_ok());
}

#[test]
fn test_queue_config_invalid_qps() {
    assert!(token_bucket(0.0, 1).validate().is_err());
    assert!(token_bucket(f64::INFINITY, 1).validate().is_err());
}

#[test]
fn test_queue_config_invalid_burst() {
    assert!(token_bucket(1.0, 0).validate().is_err());
}

#[test]
fn test_queue_set_validation() {
    let mut queues = std::collections::HashMap::new();
    queues.insert("eviction".to_string(), token_bucket(0.1, 1));
    queues.insert("termination".to_string(), QueueConfig::unlimited());

    let config = QueueSetConfig { queues };
    assert!(config.validate().is_ok());
}

#[test]
fn test_queue_set_empty() {
    let config = QueueSetConfig {
        queues: std::collections::HashMap::new(),
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_queue_set_reports_invalid_member() {
    let mut queues = std::collections::HashMap::new();
    queues.insert("eviction".to_string(), token_bucket(1.0, 0));
    let err = QueueSetConfig { queues }.validate().unwrap_err();
    assert!(err.contains("eviction"));
}

#[test]
fn test_queue_set_from_json() {
    let json = r#"{
        "queues": {
            "eviction": {
                "leak": true,
                "limiter": { "kind": "token_bucket", "qps": 0.1, "burst": 1 },
                "pass_interval_ms": 100
            },
            "termination": {
                "limiter": { "kind": "unlimited" }
            }
        }
    }"#;

    let config = QueueSetConfig::from_json_str(json).unwrap();
    assert_eq!(config.queues.len(), 2);
    assert!(config.queues["eviction"].leak);
    assert!(!config.queues["termination"].leak);
    assert_eq!(config.queues["termination"].limiter, LimiterConfig::Unlimited);
}

#[test]
fn test_queue_config_from_json_rejects_unknown_limiter() {
    let json = r#"{ "limiter": { "kind": "leaky_bucket" } }"#;
    let err = QueueConfig::from_json_str(json).unwrap_err();
    assert!(err.starts_with("parse error"));
}
