//! Monotonic tick sources
//!
//! A [`Clock`] is the only way a [`Timer`](crate::Timer) observes time. Ticks are
//! opaque: they are only meaningful relative to other readings of the same clock
//! and to its [`Clock::ticks_per_second`] rate.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use crate::error::ClockError;

pub trait Clock: fmt::Debug + Send + Sync + 'static {
    /// Read the current monotonic tick count.
    fn now(&self) -> Result<u64, ClockError>;

    /// Number of ticks per second.
    fn ticks_per_second(&self) -> u64;
}

/// Nanosecond clock backed by [`Instant`], measured from a process-wide epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonotonicClock;

const NANOS_PER_SECOND: u64 = 1_000_000_000;

fn process_epoch() -> Instant {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    *EPOCH.get_or_init(Instant::now)
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Result<u64, ClockError> {
        let nanos = process_epoch().elapsed().as_nanos();
        u64::try_from(nanos).map_err(|_| ClockError::Overflow)
    }

    #[inline]
    fn ticks_per_second(&self) -> u64 {
        NANOS_PER_SECOND
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same reading, so one handle can drive many timers:
///
/// ```
/// use tickwatch_core::{ManualClock, Timer};
///
/// let clock = ManualClock::with_frequency(1_000);
/// let timer = Timer::with_clock(Some("query".to_string()), clock.clone());
///
/// timer.start().unwrap();
/// clock.advance(25);
/// timer.finish().unwrap();
///
/// assert_eq!(timer.total_duration_ms(), 25);
/// ```
#[derive(Debug, Clone)]
pub struct ManualClock {
    inner: Arc<ManualClockState>,
}

#[derive(Debug)]
struct ManualClockState {
    ticks: AtomicU64,
    ticks_per_second: u64,
    failing: AtomicBool,
}

impl ManualClock {
    /// Create a clock at tick 0 running at one tick per nanosecond.
    pub fn new() -> Self {
        Self::with_frequency(NANOS_PER_SECOND)
    }

    pub fn with_frequency(ticks_per_second: u64) -> Self {
        Self {
            inner: Arc::new(ManualClockState {
                ticks: AtomicU64::new(0),
                ticks_per_second,
                failing: AtomicBool::new(false),
            }),
        }
    }

    pub fn set(&self, ticks: u64) {
        self.inner.ticks.store(ticks, Ordering::SeqCst);
    }

    pub fn advance(&self, ticks: u64) {
        self.inner.ticks.fetch_add(ticks, Ordering::SeqCst);
    }

    pub fn ticks(&self) -> u64 {
        self.inner.ticks.load(Ordering::SeqCst)
    }

    /// While failing, every [`Clock::now`] call returns [`ClockError::Unavailable`].
    pub fn set_failing(&self, failing: bool) {
        self.inner.failing.store(failing, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Result<u64, ClockError> {
        if self.inner.failing.load(Ordering::SeqCst) {
            return Err(ClockError::Unavailable("manual clock set to fail".to_string()));
        }
        Ok(self.ticks())
    }

    fn ticks_per_second(&self) -> u64 {
        self.inner.ticks_per_second
    }
}

/// Convert ticks to whole milliseconds, truncating.
pub fn ticks_to_millis(ticks: u64, ticks_per_second: u64) -> u64 {
    let ticks_per_milli = ticks_per_second / 1000;
    if ticks_per_milli == 0 {
        // Sub-kHz clocks: scale up instead of dividing by zero
        return ticks.saturating_mul(1000) / ticks_per_second.max(1);
    }
    ticks / ticks_per_milli
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_clock_never_goes_backwards() {
        let clock = MonotonicClock;
        let first = clock.now().unwrap();
        let second = clock.now().unwrap();
        assert!(second >= first);
        assert_eq!(clock.ticks_per_second(), 1_000_000_000);
    }

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::with_frequency(1_000);
        let other = clock.clone();

        clock.advance(10);
        other.advance(5);

        assert_eq!(clock.now().unwrap(), 15);
        assert_eq!(other.ticks(), 15);

        clock.set(3);
        assert_eq!(other.now().unwrap(), 3);
    }

    #[test]
    fn test_manual_clock_failure() {
        let clock = ManualClock::new();
        clock.set_failing(true);
        assert!(matches!(clock.now(), Err(ClockError::Unavailable(_))));

        clock.set_failing(false);
        assert_eq!(clock.now().unwrap(), 0);
    }

    #[test]
    fn test_ticks_to_millis_truncates() {
        assert_eq!(ticks_to_millis(1_999_999, 1_000_000_000), 1);
        assert_eq!(ticks_to_millis(2_000_000, 1_000_000_000), 2);
        assert_eq!(ticks_to_millis(1_500, 1_000), 1_500);
        assert_eq!(ticks_to_millis(0, 1_000_000_000), 0);
    }

    #[test]
    fn test_ticks_to_millis_low_frequency() {
        // 100 Hz: one tick is 10ms
        assert_eq!(ticks_to_millis(3, 100), 30);
        assert_eq!(ticks_to_millis(5, 0), 5_000);
    }
}
