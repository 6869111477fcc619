//! Rate-limited, deduplicating, time-ordered work queue.
//!
//! Producers call [`RateLimitedTimedQueue::add`] and
//! [`RateLimitedTimedQueue::remove`] from any thread. A single consumer
//! periodically runs [`RateLimitedTimedQueue::try_process`], which drains
//! eligible entries through a caller-supplied action and requeues the ones
//! that ask to be retried.
//!
//! The queue lock is held only inside each add/remove/pop, never across an
//! action, so actions may freely re-add or remove keys (including their own).
//!
//! # Throttling
//!
//! With `leak = true` the pass asks the limiter [`RateLimiter::can_accept`]
//! before every entry and stops as soon as it is refused, putting the entry
//! in hand back first. With `leak = false` it calls [`RateLimiter::accept`]
//! and blocks until capacity returns, so one pass eventually drains every
//! eligible entry.
//!
//! # Not-yet-due entries
//!
//! An entry whose `next` is still in the future is pushed back and the loop
//! continues immediately without sleeping, so freshly added front entries
//! can preempt it. A queue whose only entry is not yet due therefore spins on
//! the clock until it matures (paced only by the limiter when `leak = false`).
//! Callers that cannot afford that CPU cost should use `leak = true` or a
//! pacing limiter.
//!
//! Concurrent `try_process` calls are not coordinated; serialize them, for
//! example by driving passes from a single timer.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use parking_lot::RwLock;
use serde::Serialize;

use crate::core::{RateLimiter, TimedValue, UniqueQueue};
use crate::util::clock::{millis_since_epoch, Clock};

/// Smallest delay added to every retry so a failed entry is never
/// immediately eligible again.
pub const MIN_RETRY_DELAY: Duration = Duration::from_micros(1);

/// Cap applied when `now + backoff` is not representable.
const MAX_RETRY_HORIZON: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Result of running the action on one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The entry is finished and leaves the queue.
    Done,
    /// The entry must be retried no earlier than the given backoff from now.
    Retry(Duration),
}

impl ActionOutcome {
    /// Build from the `(success, backoff)` pair used by controller actions.
    pub const fn from_parts(success: bool, backoff: Duration) -> Self {
        if success {
            Self::Done
        } else {
            Self::Retry(backoff)
        }
    }

    /// Retry as soon as possible.
    pub const fn retry_now() -> Self {
        Self::Retry(Duration::ZERO)
    }
}

/// What a single pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    /// Entries whose action returned [`ActionOutcome::Done`].
    pub processed: usize,
    /// Entries requeued after [`ActionOutcome::Retry`].
    pub retried: usize,
    /// Pops of entries that were not yet due and went straight back.
    pub deferred: usize,
    /// The pass ended early because the limiter refused (leak mode).
    pub throttled: bool,
    /// The pass ended early because the queue was stopped.
    pub halted: bool,
}

impl PassReport {
    /// Number of action invocations in the pass.
    pub const fn attempts(&self) -> usize {
        self.processed + self.retried
    }
}

/// Unique-key timed queue whose processing passes are gated by a
/// [`RateLimiter`].
pub struct RateLimitedTimedQueue {
    queue: UniqueQueue,
    limiter: RwLock<Arc<dyn RateLimiter>>,
    leak: bool,
    clock: Arc<dyn Clock>,
    stopped: AtomicBool,
}

impl fmt::Debug for RateLimitedTimedQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimitedTimedQueue")
            .field("queue", &self.queue)
            .field("leak", &self.leak)
            .field("stopped", &self.stopped.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl RateLimitedTimedQueue {
    /// Create a queue. With `leak` set, throttled passes return early
    /// instead of blocking.
    pub fn new(limiter: Arc<dyn RateLimiter>, leak: bool, clock: Arc<dyn Clock>) -> Self {
        Self {
            queue: UniqueQueue::new(),
            limiter: RwLock::new(limiter),
            leak,
            clock,
            stopped: AtomicBool::new(false),
        }
    }

    /// Enqueue `key`, eligible immediately. Returns false if the key is
    /// already queued; its schedule is not changed.
    pub fn add(&self, key: &str) -> bool {
        let now = self.clock.now();
        let added = self.queue.add(TimedValue::new(key, now));
        tracing::trace!(key, added, at_ms = millis_since_epoch(now), "add");
        added
    }

    /// Remove `key` so it will not be processed until added again.
    /// Returns true if a queued entry was removed.
    pub fn remove(&self, key: &str) -> bool {
        let removed = self.queue.remove(key);
        tracing::trace!(key, removed, "remove");
        removed
    }

    /// Run one processing pass.
    ///
    /// Pops entries in `next` order, consults the limiter, and invokes
    /// `action` on each due entry. Entries answered with
    /// [`ActionOutcome::Retry`] are rescheduled at `now + backoff +`
    /// [`MIN_RETRY_DELAY`]. Returns when the queue is empty, when the limiter
    /// refuses in leak mode, or when the queue has been stopped.
    pub fn try_process<F>(&self, mut action: F) -> PassReport
    where
        F: FnMut(&TimedValue) -> ActionOutcome,
    {
        let mut report = PassReport::default();

        while let Some(mut entry) = self.queue.get() {
            if !self.admit() {
                let key = entry.value.clone();
                self.requeue(entry);
                if self.is_stopped() {
                    report.halted = true;
                    tracing::debug!(key = %key, "pass halted, queue stopped");
                } else {
                    report.throttled = true;
                    tracing::debug!(key = %key, remaining = self.queue.len(), "pass throttled");
                }
                break;
            }

            if !entry.is_due(self.clock.now()) {
                report.deferred += 1;
                self.requeue(entry);
                continue;
            }

            match action(&entry) {
                ActionOutcome::Done => {
                    report.processed += 1;
                    tracing::trace!(key = %entry.value, "entry done");
                }
                ActionOutcome::Retry(backoff) => {
                    report.retried += 1;
                    entry.next = retry_at(self.clock.now(), backoff);
                    tracing::debug!(
                        key = %entry.value,
                        backoff_ms = backoff.as_millis(),
                        next_ms = millis_since_epoch(entry.next),
                        "entry requeued for retry"
                    );
                    self.requeue(entry);
                }
            }
        }

        if report != PassReport::default() {
            tracing::debug!(
                processed = report.processed,
                retried = report.retried,
                deferred = report.deferred,
                throttled = report.throttled,
                "pass finished"
            );
        }
        report
    }

    /// Gate one pop through the limiter. False ends the pass.
    fn admit(&self) -> bool {
        if self.is_stopped() {
            return false;
        }
        if self.leak {
            return self.limiter().can_accept();
        }
        let mut limiter = self.limiter();
        loop {
            limiter.accept();
            if self.is_stopped() {
                return false;
            }
            // A swap stops the old limiter, which releases `accept` without a
            // real grant; ask the replacement instead.
            let current = self.limiter();
            if Arc::ptr_eq(&limiter, &current) {
                return true;
            }
            limiter = current;
        }
    }

    fn requeue(&self, entry: TimedValue) {
        let key = entry.value.clone();
        if !self.queue.add(entry) {
            // The key was re-added by someone else while it was out of the
            // queue; their entry stands.
            tracing::trace!(key = %key, "requeue skipped, key already present");
        }
    }

    /// Replace the limiter. The old limiter is stopped so a pass blocked on
    /// it wakes up and waits on the new one instead.
    pub fn swap_limiter(&self, limiter: Arc<dyn RateLimiter>) {
        let old = std::mem::replace(&mut *self.limiter.write(), limiter);
        old.stop();
        tracing::info!("rate limiter swapped");
    }

    /// Current limiter.
    pub fn limiter(&self) -> Arc<dyn RateLimiter> {
        self.limiter.read().clone()
    }

    /// Stop the queue: the limiter is stopped, a pass in progress returns
    /// after putting back the entry in hand, and later passes return at
    /// once. Adds and removes keep working.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
        self.limiter().stop();
        tracing::info!(remaining = self.queue.len(), "timed queue stopped");
    }

    /// Whether [`stop`](Self::stop) has been called.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Whether throttled passes leak (return early) instead of blocking.
    pub const fn leaks(&self) -> bool {
        self.leak
    }

    /// Whether `key` is queued.
    pub fn contains(&self, key: &str) -> bool {
        self.queue.contains(key)
    }

    /// Scheduled time of the earliest entry.
    pub fn next_due(&self) -> Option<SystemTime> {
        self.queue.peek_next()
    }

    /// Number of queued entries.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drop every queued entry, returning how many were dropped.
    pub fn clear(&self) -> usize {
        let dropped = self.queue.clear();
        tracing::debug!(dropped, "timed queue cleared");
        dropped
    }
}

fn retry_at(now: SystemTime, backoff: Duration) -> SystemTime {
    let delay = backoff.saturating_add(MIN_RETRY_DELAY);
    now.checked_add(delay)
        .or_else(|| now.checked_add(MAX_RETRY_HORIZON))
        .unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AlwaysAccept, NeverAccept};
    use crate::util::clock::ManualClock;
    use std::time::UNIX_EPOCH;

    fn queue(limiter: Arc<dyn RateLimiter>, leak: bool) -> (RateLimitedTimedQueue, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::at_epoch());
        let q = RateLimitedTimedQueue::new(limiter, leak, clock.clone());
        (q, clock)
    }

    #[test]
    fn add_is_unique_until_drained() {
        let (q, _) = queue(Arc::new(AlwaysAccept), false);
        assert!(q.add("a"));
        assert!(!q.add("a"));

        let report = q.try_process(|_| ActionOutcome::Done);
        assert_eq!(report.processed, 1);
        assert!(q.is_empty());
        assert!(q.add("a"));
    }

    #[test]
    fn processes_ties_exactly_once() {
        let (q, _) = queue(Arc::new(AlwaysAccept), false);
        q.add("a");
        q.add("b");

        let mut seen = Vec::new();
        q.try_process(|e| {
            seen.push(e.value.clone());
            ActionOutcome::Done
        });
        seen.sort();
        assert_eq!(seen, vec!["a", "b"]);
        assert!(q.is_empty());
    }

    #[test]
    fn leak_mode_puts_back_refused_entry() {
        let (q, _) = queue(Arc::new(NeverAccept::new()), true);
        q.add("a");
        let mut called = false;
        let report = q.try_process(|_| {
            called = true;
            ActionOutcome::Done
        });
        assert!(!called);
        assert!(report.throttled);
        assert!(q.contains("a"));
    }

    #[test]
    fn retry_adds_minimum_delay() {
        assert_eq!(
            retry_at(UNIX_EPOCH, Duration::ZERO),
            UNIX_EPOCH + MIN_RETRY_DELAY
        );
        assert_eq!(
            retry_at(UNIX_EPOCH, Duration::from_secs(3)),
            UNIX_EPOCH + Duration::from_secs(3) + MIN_RETRY_DELAY
        );
    }

    #[test]
    fn unrepresentable_backoff_is_capped() {
        let at = retry_at(UNIX_EPOCH, Duration::MAX);
        assert!(at > UNIX_EPOCH);
    }

    #[test]
    fn outcome_from_parts() {
        assert_eq!(ActionOutcome::from_parts(true, Duration::from_secs(1)), ActionOutcome::Done);
        assert_eq!(
            ActionOutcome::from_parts(false, Duration::from_secs(1)),
            ActionOutcome::Retry(Duration::from_secs(1))
        );
        assert_eq!(ActionOutcome::retry_now(), ActionOutcome::Retry(Duration::ZERO));
    }

    #[test]
    fn blocked_pass_moves_to_swapped_limiter() {
        let (q, _) = queue(Arc::new(NeverAccept::new()), false);
        let q = Arc::new(q);
        q.add("a");

        let pass = {
            let q = Arc::clone(&q);
            std::thread::spawn(move || q.try_process(|_| ActionOutcome::Done))
        };
        std::thread::sleep(Duration::from_millis(20));

        // Swapping one closed limiter for another grants nothing.
        q.swap_limiter(Arc::new(NeverAccept::new()));
        std::thread::sleep(Duration::from_millis(20));
        assert!(!pass.is_finished());

        q.swap_limiter(Arc::new(AlwaysAccept));
        let report = pass.join().unwrap();
        assert_eq!(report.processed, 1);
        assert!(q.is_empty());
    }

    #[test]
    fn stop_after_swap_still_halts() {
        let (q, _) = queue(Arc::new(NeverAccept::new()), false);
        let q = Arc::new(q);
        q.add("a");

        let pass = {
            let q = Arc::clone(&q);
            std::thread::spawn(move || q.try_process(|_| ActionOutcome::Done))
        };
        std::thread::sleep(Duration::from_millis(20));
        q.swap_limiter(Arc::new(NeverAccept::new()));
        q.stop();

        let report = pass.join().unwrap();
        assert!(report.halted);
        assert_eq!(report.attempts(), 0);
        assert!(q.contains("a"));
    }

    #[test]
    fn stopped_queue_keeps_entries() {
        let (q, _) = queue(Arc::new(AlwaysAccept), false);
        q.add("a");
        q.add("b");
        q.stop();
        let report = q.try_process(|_| ActionOutcome::Done);
        assert!(report.halted);
        assert_eq!(report.attempts(), 0);
        assert_eq!(q.len(), 2);
    }
}
