//! Application configuration

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub version: String,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReportConfig {
    pub format: ReportFormat,
    /// Joins group prefixes and timer names in labels
    pub separator: String,
    /// Include timers that were never started
    pub include_idle: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Text,
    Json,
    Csv,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.report.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0.0".to_string(),
            report: ReportConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ReportConfig {
    /// Validate report configuration
    pub fn validate(&self) -> Result<()> {
        if self.separator.is_empty() {
            return Err(Error::Validation("Separator cannot be empty".to_string()));
        }

        if self.separator.contains(['\n', '\r']) {
            return Err(Error::Validation(
                "Separator cannot contain line breaks".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: ReportFormat::Text,
            separator: ".".to_string(),
            include_idle: true,
        }
    }
}

impl ReportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportFormat::Text => "text",
            ReportFormat::Json => "json",
            ReportFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            "csv" => Ok(ReportFormat::Csv),
            other => Err(Error::Validation(format!(
                "Invalid report format '{}'. Must be one of: text, json, csv",
                other
            ))),
        }
    }
}

impl LoggingConfig {
    const LEVELS: [&'static str; 5] = ["error", "warn", "info", "debug", "trace"];

    /// Validate logging configuration
    pub fn validate(&self) -> Result<()> {
        if !Self::LEVELS.contains(&self.level.as_str()) {
            return Err(Error::Validation(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.level,
                Self::LEVELS.join(", ")
            )));
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
