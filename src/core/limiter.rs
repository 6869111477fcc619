//! Rate limiter capability consumed by
//! [`RateLimitedTimedQueue`](crate::core::RateLimitedTimedQueue).
//!
//! Uses `parking_lot::Condvar` so blocked [`RateLimiter::accept`] callers
//! can be released by [`RateLimiter::stop`] instead of sleeping blindly.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::core::QueueError;

/// Longest single sleep inside [`TokenBucket::accept`]; longer waits loop.
const MAX_ACCEPT_WAIT: Duration = Duration::from_secs(1);

/// Throughput gate for queue passes.
pub trait RateLimiter: Send + Sync {
    /// Non-blocking admission check. True if a unit of capacity is
    /// available right now.
    fn can_accept(&self) -> bool;

    /// Block until a unit of capacity is granted, then consume it.
    fn accept(&self);

    /// Fraction of capacity in use, from 0.0 (idle) to 1.0 (exhausted).
    fn saturation(&self) -> f64 {
        0.0
    }

    /// Release any callers blocked in [`accept`](Self::accept). Later
    /// `accept` calls return without waiting.
    fn stop(&self) {}
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
    stopped: bool,
}

/// Token bucket refilled continuously at `qps` tokens per second, holding at
/// most `burst` tokens. Starts full.
///
/// [`can_accept`](RateLimiter::can_accept) takes a token when one is
/// available, so in leak mode the bucket bounds how many entries a pass may
/// look at.
#[derive(Debug)]
pub struct TokenBucket {
    qps: f64,
    burst: u32,
    state: Mutex<BucketState>,
    wake: Condvar,
}

impl TokenBucket {
    /// Create a bucket, validating that both `qps` and `burst` are positive.
    pub fn new(qps: f64, burst: u32) -> Result<Self, QueueError> {
        if !qps.is_finite() || qps <= 0.0 {
            return Err(QueueError::InvalidConfig(format!(
                "qps must be a positive finite number, got {qps}"
            )));
        }
        if burst == 0 {
            return Err(QueueError::InvalidConfig("burst must be greater than 0".into()));
        }
        Ok(Self {
            qps,
            burst,
            state: Mutex::new(BucketState {
                tokens: f64::from(burst),
                last_refill: Instant::now(),
                stopped: false,
            }),
            wake: Condvar::new(),
        })
    }

    /// Sustained rate in tokens per second.
    pub const fn qps(&self) -> f64 {
        self.qps
    }

    /// Maximum number of tokens held.
    pub const fn burst(&self) -> u32 {
        self.burst
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(state.last_refill).as_secs_f64();
        state.tokens = elapsed.mul_add(self.qps, state.tokens).min(f64::from(self.burst));
        state.last_refill = now;
    }
}

impl RateLimiter for TokenBucket {
    fn can_accept(&self) -> bool {
        let mut state = self.state.lock();
        self.refill(&mut state);
        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn accept(&self) {
        let mut state = self.state.lock();
        loop {
            if state.stopped {
                return;
            }
            self.refill(&mut state);
            if state.tokens >= 1.0 {
                state.tokens -= 1.0;
                return;
            }
            let wait = Duration::try_from_secs_f64((1.0 - state.tokens) / self.qps)
                .map_or(MAX_ACCEPT_WAIT, |wait| wait.min(MAX_ACCEPT_WAIT));
            tracing::trace!(wait_us = wait.as_micros(), "token bucket exhausted, waiting");
            self.wake.wait_for(&mut state, wait);
        }
    }

    fn saturation(&self) -> f64 {
        let mut state = self.state.lock();
        self.refill(&mut state);
        (1.0 - state.tokens / f64::from(self.burst)).clamp(0.0, 1.0)
    }

    fn stop(&self) {
        self.state.lock().stopped = true;
        self.wake.notify_all();
    }
}

/// Limiter that never throttles.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysAccept;

impl RateLimiter for AlwaysAccept {
    fn can_accept(&self) -> bool {
        true
    }

    fn accept(&self) {}
}

/// Limiter that admits nothing. [`accept`](RateLimiter::accept) parks the
/// caller until [`stop`](RateLimiter::stop) is called.
#[derive(Debug, Default)]
pub struct NeverAccept {
    stopped: Mutex<bool>,
    wake: Condvar,
}

impl NeverAccept {
    /// New closed limiter.
    pub fn new() -> Self {
        Self::default()
    }
}

impl RateLimiter for NeverAccept {
    fn can_accept(&self) -> bool {
        false
    }

    fn accept(&self) {
        let mut stopped = self.stopped.lock();
        while !*stopped {
            self.wake.wait(&mut stopped);
        }
    }

    fn saturation(&self) -> f64 {
        1.0
    }

    fn stop(&self) {
        *self.stopped.lock() = true;
        self.wake.notify_all();
    }
}
