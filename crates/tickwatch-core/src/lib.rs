//! Named, accumulating stopwatches and statically declared groups of them.

pub mod clock;
pub mod error;
pub mod models;
pub mod storage;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use error::{ClockError, Error, Result};
pub use models::{
    Config, GroupReport, LoggingConfig, Member, ReportConfig, ReportFormat, Timer, TimerGroup,
    TimerGuard, TimerSnapshot, TimerState,
};
