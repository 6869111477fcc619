//! Queue entries carrying their scheduling timestamps.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// A key that should be processed at a designated time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedValue {
    /// Opaque key; at most one entry per key is queued at a time.
    pub value: String,
    /// When the key was first enqueued.
    pub added: SystemTime,
    /// Earliest time the entry may be processed.
    pub next: SystemTime,
}

impl TimedValue {
    /// Entry that is immediately eligible at `at`.
    pub fn new(value: impl Into<String>, at: SystemTime) -> Self {
        Self {
            value: value.into(),
            added: at,
            next: at,
        }
    }

    /// Entry added at `added` that becomes eligible at `next`.
    pub fn scheduled(value: impl Into<String>, added: SystemTime, next: SystemTime) -> Self {
        Self {
            value: value.into(),
            added,
            next,
        }
    }

    /// Whether the entry is eligible for processing at `now`.
    pub fn is_due(&self, now: SystemTime) -> bool {
        self.next <= now
    }
}
