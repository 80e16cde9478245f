//! Point-in-time views of timers for reporting

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::Clock;

use super::{ReportConfig, TimerGroup};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimerSnapshot {
    pub label: String,
    pub count: u64,
    pub total_ticks: u64,
    pub total_ms: u64,
    pub average_ticks: u64,
    pub average_ms: u64,
    pub last_ms: u64,
    /// An interval was still open when the snapshot was taken
    pub open: bool,
}

impl TimerSnapshot {
    pub fn is_idle(&self) -> bool {
        self.count == 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupReport {
    pub generated_at: DateTime<Utc>,
    pub timers: Vec<TimerSnapshot>,
}

impl GroupReport {
    /// Snapshot every timer of `group` in enumeration order.
    pub fn collect<C, G>(group: &G, config: &ReportConfig) -> Self
    where
        C: Clock,
        G: TimerGroup<C> + ?Sized,
    {
        let timers = group
            .labeled_timers(&config.separator)
            .into_iter()
            .map(|(label, timer)| timer.snapshot(label))
            .filter(|snapshot| config.include_idle || !snapshot.is_idle())
            .collect();

        Self {
            generated_at: Utc::now(),
            timers,
        }
    }

    pub fn get(&self, label: &str) -> Option<&TimerSnapshot> {
        self.timers.iter().find(|snapshot| snapshot.label == label)
    }

    pub fn total_count(&self) -> u64 {
        self.timers.iter().map(|snapshot| snapshot.count).sum()
    }
}

impl fmt::Display for GroupReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .timers
            .iter()
            .map(|snapshot| snapshot.label.len())
            .max()
            .unwrap_or(0)
            .max("timer".len());

        writeln!(
            f,
            "{:width$} | {:>8} | {:>10} | {:>8} | {:>8}",
            "timer", "calls", "total ms", "avg ms", "last ms"
        )?;
        writeln!(f, "{}", "-".repeat(width + 46))?;
        for snapshot in &self.timers {
            let marker = if snapshot.open { " *" } else { "" };
            writeln!(
                f,
                "{:width$} | {:>8} | {:>10} | {:>8} | {:>8}{}",
                snapshot.label,
                snapshot.count,
                snapshot.total_ms,
                snapshot.average_ms,
                snapshot.last_ms,
                marker
            )?;
        }
        Ok(())
    }
}
