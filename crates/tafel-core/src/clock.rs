//! Scheduling and wall clocks.
//!
//! Every timer in the session core (message purge, auto-dismiss, save
//! throttle) is a deadline against an injected clock, driven by explicit
//! ticks from the host loop. `StdClock` is the production clock;
//! `ManualClock` makes timer behavior deterministic in tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use time::OffsetDateTime;

/// Clock interface for deadlines and event timestamps.
pub trait Clock: Send + Sync + 'static {
    /// Monotonic time since the clock was created.
    fn now(&self) -> Duration;

    /// Current wall-clock time (UTC).
    fn timestamp(&self) -> OffsetDateTime;
}

/// Monotonic clock based on `std::time::Instant` plus the system wall clock.
#[derive(Debug, Clone)]
pub struct StdClock {
    start: std::time::Instant,
}

impl StdClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }
}

impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for StdClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn timestamp(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

#[derive(Debug)]
struct ManualClockState {
    now: Duration,
    epoch: OffsetDateTime,
}

/// Deterministic clock for tests.
#[derive(Debug, Clone)]
pub struct ManualClock {
    inner: Arc<Mutex<ManualClockState>>,
}

impl ManualClock {
    /// Create a manual clock starting at zero, with the Unix epoch as its
    /// wall-clock base.
    #[must_use]
    pub fn new() -> Self {
        Self::with_epoch(OffsetDateTime::UNIX_EPOCH)
    }

    /// Create a manual clock whose wall clock starts at `epoch`.
    #[must_use]
    pub fn with_epoch(epoch: OffsetDateTime) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ManualClockState {
                now: Duration::ZERO,
                epoch,
            })),
        }
    }

    /// Advance time by the given delta.
    pub fn advance(&self, delta: Duration) {
        let mut state = self.inner.lock().expect("manual clock lock poisoned");
        state.now = state.now.saturating_add(delta);
    }

    /// Set the monotonic time explicitly.
    pub fn set_time(&self, now: Duration) {
        let mut state = self.inner.lock().expect("manual clock lock poisoned");
        state.now = now;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        let state = self.inner.lock().expect("manual clock lock poisoned");
        state.now
    }

    fn timestamp(&self) -> OffsetDateTime {
        let state = self.inner.lock().expect("manual clock lock poisoned");
        state.epoch + state.now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn manual_clock_advances_wall_clock_with_monotonic_time() {
        let clock = ManualClock::with_epoch(datetime!(2016-05-01 12:00 UTC));
        clock.advance(Duration::from_secs(90));
        assert_eq!(clock.now(), Duration::from_secs(90));
        assert_eq!(clock.timestamp(), datetime!(2016-05-01 12:01:30 UTC));
    }

    #[test]
    fn manual_clock_set_time_is_absolute() {
        let clock = ManualClock::new();
        clock.advance(Duration::from_secs(5));
        clock.set_time(Duration::from_secs(2));
        assert_eq!(clock.now(), Duration::from_secs(2));
    }
}
