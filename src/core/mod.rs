//! Core queue layers: timed entries, the ordered heap, the unique queue, and
//! the rate-limited processing loop on top.

pub mod error;
pub mod limiter;
pub mod rate_limited;
pub mod timed_heap;
pub mod timed_value;
pub mod unique_queue;

pub use error::{AppResult, QueueError};
pub use limiter::{AlwaysAccept, NeverAccept, RateLimiter, TokenBucket};
pub use rate_limited::{ActionOutcome, PassReport, RateLimitedTimedQueue, MIN_RETRY_DELAY};
pub use timed_heap::{HeapHandle, TimedHeap};
pub use timed_value::TimedValue;
pub use unique_queue::UniqueQueue;
