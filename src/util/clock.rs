//! Injectable time sources.
//!
//! Every timestamp the queue records comes from a [`Clock`] handed to it at
//! construction, so tests can drive time explicitly instead of sleeping.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Current timestamp.
    fn now(&self) -> SystemTime;
}

/// Wall-clock time from the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Manually driven clock for deterministic tests.
///
/// With a non-zero `step`, each [`Clock::now`] read returns the current
/// instant and then moves the clock forward by `step`.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<SystemTime>,
    step: Duration,
}

impl ManualClock {
    /// Frozen clock starting at `start`.
    pub fn new(start: SystemTime) -> Self {
        Self::ticking(start, Duration::ZERO)
    }

    /// Clock starting at `start` that advances by `step` after every read.
    pub fn ticking(start: SystemTime, step: Duration) -> Self {
        Self {
            now: Mutex::new(start),
            step,
        }
    }

    /// Frozen clock at the UNIX epoch, convenient as `t = 0`.
    pub fn at_epoch() -> Self {
        Self::new(UNIX_EPOCH)
    }

    /// Move the clock forward. An advance past the largest representable
    /// time leaves the clock where it is.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        if let Some(next) = now.checked_add(by) {
            *now = next;
        }
    }

    /// Jump to an absolute instant.
    pub fn set(&self, to: SystemTime) {
        *self.now.lock() = to;
    }

    /// Read the clock without applying the auto-advance step.
    pub fn peek(&self) -> SystemTime {
        *self.now.lock()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        let mut now = self.now.lock();
        let current = *now;
        if let Some(next) = current.checked_add(self.step) {
            *now = next;
        }
        current
    }
}

/// Milliseconds since the UNIX epoch for `at`; zero for instants before it.
pub fn millis_since_epoch(at: SystemTime) -> u128 {
    at.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

/// Current wall-clock time in milliseconds since the UNIX epoch.
pub fn now_ms() -> u128 {
    millis_since_epoch(SystemTime::now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_is_frozen_until_advanced() {
        let clock = ManualClock::at_epoch();
        assert_eq!(clock.now(), UNIX_EPOCH);
        assert_eq!(clock.now(), UNIX_EPOCH);

        clock.advance(Duration::from_secs(5));
        assert_eq!(clock.now(), UNIX_EPOCH + Duration::from_secs(5));
    }

    #[test]
    fn ticking_clock_moves_after_each_read() {
        let clock = ManualClock::ticking(UNIX_EPOCH, Duration::from_millis(10));
        assert_eq!(clock.now(), UNIX_EPOCH);
        assert_eq!(clock.now(), UNIX_EPOCH + Duration::from_millis(10));
        assert_eq!(clock.peek(), UNIX_EPOCH + Duration::from_millis(20));
    }

    #[test]
    fn unrepresentable_advance_is_ignored() {
        let clock = ManualClock::new(UNIX_EPOCH + Duration::from_secs(7));
        clock.advance(Duration::MAX);
        assert_eq!(clock.now(), UNIX_EPOCH + Duration::from_secs(7));

        let ticking = ManualClock::ticking(UNIX_EPOCH, Duration::MAX);
        assert_eq!(ticking.now(), UNIX_EPOCH);
        assert_eq!(ticking.now(), UNIX_EPOCH);
    }

    #[test]
    fn set_jumps_to_absolute_time() {
        let clock = ManualClock::at_epoch();
        clock.set(UNIX_EPOCH + Duration::from_secs(60));
        assert_eq!(millis_since_epoch(clock.now()), 60_000);
    }

    #[test]
    fn system_clock_tracks_wall_time() {
        let before = now_ms();
        let read = millis_since_epoch(SystemClock.now());
        assert!(read >= before);
    }
}
