//! Report rendering (text, JSON, CSV)

use std::io::Write;

use anyhow::Result;
use serde::Serialize;
use tickwatch_core::{GroupReport, ReportFormat, TimerSnapshot};

/// CSV-friendly representation of a timer snapshot
#[derive(Debug, Serialize)]
struct TimerCsv<'a> {
    generated_at: String,
    label: &'a str,
    count: u64,
    total_ms: u64,
    average_ms: u64,
    last_ms: u64,
    total_ticks: u64,
    open: bool,
}

impl<'a> TimerCsv<'a> {
    fn new(report: &GroupReport, snapshot: &'a TimerSnapshot) -> Self {
        Self {
            generated_at: report.generated_at.to_rfc3339(),
            label: &snapshot.label,
            count: snapshot.count,
            total_ms: snapshot.total_ms,
            average_ms: snapshot.average_ms,
            last_ms: snapshot.last_ms,
            total_ticks: snapshot.total_ticks,
            open: snapshot.open,
        }
    }
}

pub fn render<W: Write>(report: &GroupReport, format: ReportFormat, mut out: W) -> Result<()> {
    match format {
        ReportFormat::Text => write!(out, "{report}")?,
        ReportFormat::Json => {
            serde_json::to_writer_pretty(&mut out, report)?;
            writeln!(out)?;
        }
        ReportFormat::Csv => {
            let mut writer = csv::Writer::from_writer(&mut out);
            for snapshot in &report.timers {
                writer.serialize(TimerCsv::new(report, snapshot))?;
            }
            writer.flush()?;
        }
    }
    Ok(())
}
