//! Error types for queue construction and configuration.
//!
//! Queue operations themselves never fail: membership changes report a
//! `bool` and action failures are expressed through
//! [`ActionOutcome`](crate::core::ActionOutcome).

use thiserror::Error;

/// Errors produced while building queues and limiters.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Configuration values are out of range or unparsable.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
