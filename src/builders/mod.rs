//! Builders to construct queues and limiters from configuration.

pub mod queue_builder;

pub use queue_builder::{build_limiter, build_queue, build_queues};
