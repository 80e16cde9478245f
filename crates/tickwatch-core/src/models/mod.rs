pub mod config;
pub mod group;
pub mod report;
pub mod timer;

pub use config::{Config, LoggingConfig, ReportConfig, ReportFormat};
pub use group::{Member, TimerGroup};
pub use report::{GroupReport, TimerSnapshot};
pub use timer::{Timer, TimerGuard, TimerState};
