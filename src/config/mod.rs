//! Configuration models for queues and rate limiters.

pub mod queue;

pub use queue::{LimiterConfig, QueueConfig, QueueSetConfig, DEFAULT_BURST, DEFAULT_PASS_INTERVAL_MS};
