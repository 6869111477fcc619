//! # Prometheus Timed Queue
//!
//! A rate-limited, deduplicating, time-ordered work queue for control loops.
//!
//! Controllers use it to schedule deferred actions ("evict this node after a
//! grace period") exactly once per key, under a global throughput limit, with
//! retry-with-backoff when an action cannot complete yet.
//!
//! ## Layers
//!
//! - [`core::TimedValue`]: a key with its insertion and next-eligible times
//! - [`core::TimedHeap`]: index-tracking min-heap on the next-eligible time
//! - [`core::UniqueQueue`]: the heap plus a membership map behind one mutex,
//!   so each key is queued at most once
//! - [`core::RateLimitedTimedQueue`]: the processing loop, gated by a
//!   pluggable [`core::RateLimiter`] with either a leak (stop the pass) or
//!   block (wait for capacity) policy
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use prometheus_timed_queue::core::{ActionOutcome, AlwaysAccept, RateLimitedTimedQueue};
//! use prometheus_timed_queue::util::clock::SystemClock;
//!
//! let queue = RateLimitedTimedQueue::new(Arc::new(AlwaysAccept), true, Arc::new(SystemClock));
//! assert!(queue.add("node-1"));
//! assert!(!queue.add("node-1"));
//!
//! let report = queue.try_process(|entry| {
//!     if entry.value == "node-1" {
//!         ActionOutcome::Done
//!     } else {
//!         ActionOutcome::Retry(Duration::from_secs(5))
//!     }
//! });
//! assert_eq!(report.processed, 1);
//! assert!(queue.is_empty());
//! ```
//!
//! For configuration-driven setup see [`builders::build_queue`], and for a
//! periodic tokio driver see `runtime::spawn_periodic` (feature
//! `tokio-runtime`).

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Queue layers, rate limiters, and error types.
pub mod core;
/// Configuration models for queues and limiters.
pub mod config;
/// Builders to construct queues from configuration.
pub mod builders;
/// Runtime adapters that drive processing passes.
#[cfg(feature = "tokio-runtime")]
pub mod runtime;
/// Shared utilities.
pub mod util;
