//! Tokio driver that runs processing passes on a fixed period.
//!
//! Passes run on tokio's blocking pool because a non-leaking pass may block
//! inside [`RateLimiter::accept`](crate::core::RateLimiter::accept). One
//! driver never overlaps its own passes, which gives the single-consumer
//! discipline [`RateLimitedTimedQueue::try_process`] expects.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::core::{ActionOutcome, RateLimitedTimedQueue, TimedValue};

/// Handle to a running periodic pass loop.
#[derive(Debug)]
pub struct PassDriver {
    queue: Arc<RateLimitedTimedQueue>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
    passes: Arc<AtomicU64>,
}

/// Spawn a loop on `handle` that runs `queue.try_process(action)` every
/// `period`. A pass that overruns the period delays the next tick rather
/// than bunching passes up.
pub fn spawn_periodic<F>(
    handle: &Handle,
    queue: Arc<RateLimitedTimedQueue>,
    period: Duration,
    action: F,
) -> PassDriver
where
    F: FnMut(&TimedValue) -> ActionOutcome + Send + 'static,
{
    let (shutdown, mut shutdown_rx) = watch::channel(false);
    let passes = Arc::new(AtomicU64::new(0));
    let action = Arc::new(Mutex::new(action));

    let task = {
        let queue = Arc::clone(&queue);
        let passes = Arc::clone(&passes);
        handle.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::info!(period_ms = period.as_millis(), "pass driver started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                        continue;
                    }
                }
                if queue.is_stopped() {
                    break;
                }

                let pass_queue = Arc::clone(&queue);
                let pass_action = Arc::clone(&action);
                let outcome = tokio::task::spawn_blocking(move || {
                    let mut action = pass_action.lock();
                    pass_queue.try_process(&mut *action)
                })
                .await;

                match outcome {
                    Ok(report) => {
                        passes.fetch_add(1, Ordering::Relaxed);
                        if report.throttled {
                            tracing::debug!(remaining = queue.len(), "pass throttled, resuming next tick");
                        }
                    }
                    Err(err) => tracing::error!("pass failed: {err}"),
                }
            }
            tracing::info!("pass driver stopped");
        })
    };

    PassDriver {
        queue,
        shutdown,
        task,
        passes,
    }
}

impl PassDriver {
    /// Number of passes completed so far.
    pub fn passes(&self) -> u64 {
        self.passes.load(Ordering::Relaxed)
    }

    /// The queue this driver drains.
    pub const fn queue(&self) -> &Arc<RateLimitedTimedQueue> {
        &self.queue
    }

    /// Stop the loop and wait for it to exit. The queue is stopped too, so
    /// a pass blocked on the limiter returns and queued entries stay put.
    pub async fn shutdown(self) {
        self.queue.stop();
        let _ = self.shutdown.send(true);
        if let Err(err) = self.task.await {
            tracing::error!("pass driver task failed: {err}");
        }
    }
}
