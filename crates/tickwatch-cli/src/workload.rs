//! Built-in workload instrumented with a nested timer group

use std::io::Write;
use std::time::Duration;

use anyhow::Result;
use tickwatch_core::{timer_group, Clock, Timer};

timer_group! {
    #[derive(Debug)]
    pub struct IoTimers {
        timers { sleep, write }
    }
}

timer_group! {
    #[derive(Debug)]
    pub struct WorkloadTimers {
        timers { total, fibonacci, sort }
        groups { io: IoTimers }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    /// Fibonacci index computed per iteration
    pub depth: u32,
    pub iterations: u32,
    /// Values sorted per iteration
    pub batch: usize,
    pub pause: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            depth: 20,
            iterations: 5,
            batch: 10_000,
            pause: Duration::from_millis(2),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Summary {
    pub fibonacci: u64,
    pub checksum: u64,
    pub bytes_written: usize,
}

pub fn run(timers: &WorkloadTimers, settings: &Settings) -> Result<Summary> {
    let _total = timers.total.guard()?;
    let mut summary = Summary::default();
    let mut sink = Vec::new();

    for iteration in 0..settings.iterations {
        summary.fibonacci = fibonacci(&timers.fibonacci, settings.depth)?;

        let mut values = scrambled(u64::from(iteration), settings.batch);
        timers.sort.time(|| values.sort_unstable());

        {
            let _sleep = timers.io.sleep.guard()?;
            std::thread::sleep(settings.pause);
        }

        let checksum = values
            .iter()
            .fold(0u64, |acc, v| acc.wrapping_mul(31).wrapping_add(*v));
        summary.checksum = checksum;
        summary.bytes_written += timers
            .io
            .write
            .try_time(|| write_record(&mut sink, iteration, checksum))?;

        tracing::debug!(iteration, checksum, "iteration complete");
    }

    Ok(summary)
}

/// Naive recursive Fibonacci; every call re-enters `timer`.
fn fibonacci<C: Clock>(timer: &Timer<C>, n: u32) -> tickwatch_core::Result<u64> {
    let interval = timer.guard()?;
    let value = if n < 2 {
        u64::from(n)
    } else {
        fibonacci(timer, n - 1)? + fibonacci(timer, n - 2)?
    };
    interval.finish()?;
    Ok(value)
}

/// Deterministic pseudo-random values (64-bit LCG).
fn scrambled(seed: u64, len: usize) -> Vec<u64> {
    let mut state = seed.wrapping_add(0x9E37_79B9_7F4A_7C15);
    (0..len)
        .map(|_| {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            state >> 16
        })
        .collect()
}

fn write_record(sink: &mut Vec<u8>, iteration: u32, checksum: u64) -> std::io::Result<usize> {
    let before = sink.len();
    writeln!(sink, "{iteration},{checksum:016x}")?;
    Ok(sink.len() - before)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use tickwatch_core::{ClockError, ManualClock, TimerGroup, TimerState};

    fn quick() -> Settings {
        Settings {
            depth: 10,
            iterations: 3,
            batch: 64,
            pause: Duration::from_millis(1),
        }
    }

    #[test]
    fn test_fibonacci_counts_outer_call_once() {
        let timer = Timer::named("fibonacci");
        assert_eq!(fibonacci(&timer, 10).unwrap(), 55);
        assert_eq!(timer.count(), 1);
        assert_eq!(timer.state(), TimerState::Idle);
    }

    /// Fails exactly one read, then recovers.
    #[derive(Debug)]
    struct FailsOnce {
        inner: ManualClock,
        reads: AtomicU64,
        fail_at: u64,
    }

    impl Clock for FailsOnce {
        fn now(&self) -> std::result::Result<u64, ClockError> {
            let read = self.reads.fetch_add(1, Ordering::SeqCst) + 1;
            if read == self.fail_at {
                return Err(ClockError::Unavailable("transient".to_string()));
            }
            self.inner.advance(1);
            self.inner.now()
        }

        fn ticks_per_second(&self) -> u64 {
            self.inner.ticks_per_second()
        }
    }

    #[test]
    fn test_fibonacci_closes_interval_on_clock_failure() {
        let clock = FailsOnce {
            inner: ManualClock::with_frequency(1_000),
            reads: AtomicU64::new(0),
            fail_at: 3,
        };
        let timer = Timer::with_clock(Some("fibonacci".to_string()), clock);

        // third read is fib(1)'s start; fib(2) and fib(3) still finish on unwind
        assert!(fibonacci(&timer, 3).is_err());
        assert_eq!(timer.depth(), 0);
        assert_eq!(timer.count(), 1);

        assert_eq!(fibonacci(&timer, 3).unwrap(), 2);
        assert_eq!(timer.count(), 2);
        assert_eq!(timer.state(), TimerState::Idle);
    }

    #[test]
    fn test_run_counts_per_iteration() {
        let timers = WorkloadTimers::new();
        let summary = run(&timers, &quick()).unwrap();

        assert_eq!(summary.fibonacci, 55);
        // "{iteration},{checksum:016x}\n"
        assert_eq!(summary.bytes_written, 3 * 19);
        assert_eq!(timers.total.count(), 1);
        assert_eq!(timers.fibonacci.count(), 3);
        assert_eq!(timers.sort.count(), 3);
        assert_eq!(timers.io.sleep.count(), 3);
        assert_eq!(timers.io.write.count(), 3);
        assert!(timers.io.sleep.total_duration_ms() >= 3);
        assert!(timers.total.total_duration() >= timers.io.sleep.total_duration());
        assert!(timers.timers().iter().all(|t| !t.is_open()));
    }

    #[test]
    fn test_zero_iterations_leaves_group_idle() {
        let timers = WorkloadTimers::new();
        let settings = Settings {
            iterations: 0,
            ..quick()
        };

        let summary = run(&timers, &settings).unwrap();

        assert_eq!(summary, Summary::default());
        assert_eq!(timers.total.count(), 1);
        assert_eq!(timers.timers().iter().filter(|t| t.count() == 0).count(), 4);
    }

    #[test]
    fn test_scrambled_is_deterministic() {
        assert_eq!(scrambled(7, 16), scrambled(7, 16));
        assert_ne!(scrambled(7, 16), scrambled(8, 16));
        assert_eq!(scrambled(0, 0).len(), 0);
    }
}
