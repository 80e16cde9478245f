//! Named accumulating stopwatch

use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::clock::{ticks_to_millis, Clock, MonotonicClock};
use crate::{Error, Result};

use super::TimerSnapshot;

const UNNAMED: &str = "unnamed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    /// No open interval; the next `start()` is counted.
    Idle,
    /// A `start()` is waiting for its `finish()`.
    Open,
}

/// Accumulates elapsed ticks and invocation counts across start/finish cycles.
///
/// Every operation takes `&self`. Counters are relaxed atomics, so [`Timer::time`]
/// and [`Timer::try_time`] may run concurrently on one instance. A single
/// instance must not be driven through [`Timer::start`]/[`Timer::finish`] from
/// several threads at once: the totals are then unspecified.
///
/// Re-entrant use is supported. A `start()` issued while an interval is open
/// banks the time elapsed so far and keeps the interval open without counting
/// it again; the matching `finish()` banks and re-opens, and only the
/// outermost `finish()` closes the interval:
///
/// ```
/// use tickwatch_core::{ManualClock, Timer};
///
/// let clock = ManualClock::with_frequency(1_000);
/// let timer = Timer::with_clock(Some("walk".to_string()), clock.clone());
///
/// timer.start().unwrap();
/// clock.advance(4);
/// timer.start().unwrap(); // recursive call
/// clock.advance(6);
/// timer.finish().unwrap();
/// clock.advance(2);
/// timer.finish().unwrap();
///
/// assert_eq!(timer.count(), 1);
/// assert_eq!(timer.total_duration(), 12);
/// ```
#[derive(Debug)]
pub struct Timer<C: Clock = MonotonicClock> {
    name: Option<String>,
    clock: C,
    total_duration: AtomicU64,
    count: AtomicU64,
    last_start_time: AtomicU64,
    last_finish_time: AtomicU64,
    /// Stamp of the outermost `start()` of the open interval
    interval_start_time: AtomicU64,
    last_duration: AtomicU64,
    depth: AtomicU32,
}

impl Timer {
    pub fn new(name: Option<String>) -> Self {
        Self::with_clock(name, MonotonicClock)
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::new(Some(name.into()))
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new(None)
    }
}

impl<C: Clock> Timer<C> {
    pub fn with_clock(name: Option<String>, clock: C) -> Self {
        Self {
            name,
            clock,
            total_duration: AtomicU64::new(0),
            count: AtomicU64::new(0),
            last_start_time: AtomicU64::new(0),
            last_finish_time: AtomicU64::new(0),
            interval_start_time: AtomicU64::new(0),
            last_duration: AtomicU64::new(0),
            depth: AtomicU32::new(0),
        }
    }

    /// Begin a measurement interval, or continue the open one.
    ///
    /// On a clock failure the timer is left untouched.
    pub fn start(&self) -> Result<()> {
        let now = if self.is_open() {
            self.fold()?
        } else {
            let now = self.clock.now()?;
            self.count.fetch_add(1, Ordering::Relaxed);
            self.interval_start_time.store(now, Ordering::Relaxed);
            now
        };

        self.reopen_at(now);
        self.depth.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Close the innermost open interval and add its time to the total.
    ///
    /// Fails with [`Error::UnbalancedFinish`] when nothing is open. On a clock
    /// failure the interval stays open.
    pub fn finish(&self) -> Result<()> {
        let depth = self.depth.load(Ordering::Relaxed);
        if depth == 0 {
            tracing::warn!(timer = self.label(), "finish() without an open interval");
            return Err(Error::UnbalancedFinish(self.label().to_string()));
        }

        let now = self.fold()?;
        if depth > 1 {
            self.reopen_at(now);
        } else {
            let started = self.interval_start_time.load(Ordering::Relaxed);
            self.last_duration
                .store(now.saturating_sub(started), Ordering::Relaxed);
        }
        self.depth.store(depth - 1, Ordering::Relaxed);
        Ok(())
    }

    /// Start now and finish when the returned guard is dropped.
    pub fn guard(&self) -> Result<TimerGuard<'_, C>> {
        self.start()?;
        Ok(TimerGuard { timer: self })
    }

    /// Measure one call of `action` and return its value.
    ///
    /// Does not touch the start/finish bookkeeping, so it never disturbs an open
    /// interval. If the clock cannot be read the call is counted with zero
    /// duration; `action` runs regardless. If `action` panics the call stays
    /// counted and its duration is dropped.
    pub fn time<R>(&self, action: impl FnOnce() -> R) -> R {
        self.count.fetch_add(1, Ordering::Relaxed);
        let started = self.read_or_warn();
        let value = action();
        self.record_since(started);
        value
    }

    /// Like [`Timer::time`] for fallible actions. An `Err` is returned as is and
    /// the duration of that call is discarded.
    pub fn try_time<T, E>(
        &self,
        action: impl FnOnce() -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E> {
        self.count.fetch_add(1, Ordering::Relaxed);
        let started = self.read_or_warn();
        let value = action()?;
        self.record_since(started);
        Ok(value)
    }

    /// Zero all counters and stamps. The name is kept.
    pub fn reset(&self) {
        self.total_duration.store(0, Ordering::Relaxed);
        self.count.store(0, Ordering::Relaxed);
        self.last_start_time.store(0, Ordering::Relaxed);
        self.last_finish_time.store(0, Ordering::Relaxed);
        self.interval_start_time.store(0, Ordering::Relaxed);
        self.last_duration.store(0, Ordering::Relaxed);
        self.depth.store(0, Ordering::Relaxed);
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The name, or `"unnamed"`.
    pub fn label(&self) -> &str {
        self.name().unwrap_or(UNNAMED)
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Accumulated ticks across all folded intervals.
    pub fn total_duration(&self) -> u64 {
        self.total_duration.load(Ordering::Relaxed)
    }

    pub fn average_duration(&self) -> u64 {
        match self.count() {
            0 => 0,
            count => self.total_duration() / count,
        }
    }

    /// Ticks between the outermost `start()` and matching `finish()` of the
    /// most recently completed interval. Nested calls do not shorten it.
    pub fn last_duration(&self) -> u64 {
        self.last_duration.load(Ordering::Relaxed)
    }

    pub fn total_duration_ms(&self) -> u64 {
        self.to_millis(self.total_duration())
    }

    pub fn average_duration_ms(&self) -> u64 {
        self.to_millis(self.average_duration())
    }

    pub fn last_duration_ms(&self) -> u64 {
        self.to_millis(self.last_duration())
    }

    pub fn ticks_per_second(&self) -> u64 {
        self.clock.ticks_per_second()
    }

    pub fn state(&self) -> TimerState {
        if self.is_open() {
            TimerState::Open
        } else {
            TimerState::Idle
        }
    }

    pub fn is_open(&self) -> bool {
        self.depth() > 0
    }

    /// Number of `start()` calls still awaiting a `finish()`.
    pub fn depth(&self) -> u32 {
        self.depth.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self, label: impl Into<String>) -> TimerSnapshot {
        TimerSnapshot {
            label: label.into(),
            count: self.count(),
            total_ticks: self.total_duration(),
            total_ms: self.total_duration_ms(),
            average_ticks: self.average_duration(),
            average_ms: self.average_duration_ms(),
            last_ms: self.last_duration_ms(),
            open: self.is_open(),
        }
    }

    /// Read the clock, bank the ticks since the last start stamp and stamp the finish.
    fn fold(&self) -> Result<u64> {
        let now = self.clock.now()?;
        let started = self.last_start_time.load(Ordering::Relaxed);
        self.total_duration
            .fetch_add(now.saturating_sub(started), Ordering::Relaxed);
        self.last_finish_time.store(now, Ordering::Relaxed);
        Ok(now)
    }

    fn reopen_at(&self, now: u64) {
        self.last_start_time.store(now, Ordering::Relaxed);
        self.last_finish_time.store(now, Ordering::Relaxed);
    }

    fn read_or_warn(&self) -> Option<u64> {
        match self.clock.now() {
            Ok(now) => Some(now),
            Err(e) => {
                tracing::warn!(timer = self.label(), error = %e, "clock read failed, recording zero duration");
                None
            }
        }
    }

    fn record_since(&self, started: Option<u64>) {
        let Some(started) = started else {
            return;
        };
        if let Some(finished) = self.read_or_warn() {
            self.total_duration
                .fetch_add(finished.saturating_sub(started), Ordering::Relaxed);
        }
    }

    fn to_millis(&self, ticks: u64) -> u64 {
        ticks_to_millis(ticks, self.clock.ticks_per_second())
    }
}

impl<C: Clock> fmt::Display for Timer<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: count={} total={}ms avg={}ms last={}ms",
            self.label(),
            self.count(),
            self.total_duration_ms(),
            self.average_duration_ms(),
            self.last_duration_ms()
        )
    }
}

/// Open interval on a [`Timer`] that finishes when dropped.
#[must_use = "the interval closes as soon as the guard is dropped"]
#[derive(Debug)]
pub struct TimerGuard<'a, C: Clock = MonotonicClock> {
    timer: &'a Timer<C>,
}

impl<C: Clock> TimerGuard<'_, C> {
    /// Finish explicitly and surface any error instead of logging it.
    pub fn finish(self) -> Result<()> {
        let timer = self.timer;
        std::mem::forget(self);
        timer.finish()
    }
}

impl<C: Clock> Drop for TimerGuard<'_, C> {
    fn drop(&mut self) {
        if let Err(e) = self.timer.finish() {
            tracing::warn!(timer = self.timer.label(), error = %e, "failed to finish guarded interval");
        }
    }
}
