//! Tickwatch CLI
//!
//! Runs an instrumented workload and prints the report of its timer group.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tickwatch_core::storage::{self, ConfigStorage};
use tickwatch_core::{Config, GroupReport, LoggingConfig, ReportFormat};
use tracing_subscriber::EnvFilter;

mod output;
mod workload;

#[derive(Parser, Debug)]
#[command(name = "tickwatch")]
#[command(about = "Tickwatch - accumulating stopwatches and timer groups", long_about = None)]
struct Args {
    /// Config file (default: <config dir>/tickwatch/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level, overrides the config file
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the built-in workload and print its timers
    Run {
        /// Fibonacci index computed recursively each iteration
        #[arg(long, default_value_t = 20)]
        depth: u32,

        #[arg(short, long, default_value_t = 5)]
        iterations: u32,

        /// Values sorted each iteration
        #[arg(long, default_value_t = 10_000)]
        batch: usize,

        /// Sleep per iteration, in milliseconds
        #[arg(long, default_value_t = 2)]
        pause_ms: u64,

        /// Output format: text, json or csv
        #[arg(short, long)]
        format: Option<ReportFormat>,

        /// Leave out timers that never ran
        #[arg(long)]
        hide_idle: bool,
    },

    /// Write the default configuration file
    InitConfig,

    /// Print the effective configuration
    ShowConfig,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let (config, config_path) = load_config(args.config.as_deref())?;
    let log_level = resolve_log_level(args.log_level.clone(), &config)?;
    init_logging(&log_level)?;

    tracing::debug!("Using config {}", config_path.display());

    match args.command {
        Command::Run {
            depth,
            iterations,
            batch,
            pause_ms,
            format,
            hide_idle,
        } => {
            let settings = workload::Settings {
                depth,
                iterations,
                batch,
                pause: Duration::from_millis(pause_ms),
            };
            let mut report_config = config.report.clone();
            if let Some(format) = format {
                report_config.format = format;
            }
            if hide_idle {
                report_config.include_idle = false;
            }

            tracing::info!(depth, iterations, batch, "Running workload");
            let timers = workload::WorkloadTimers::new();
            let summary = workload::run(&timers, &settings)?;
            tracing::info!(
                fibonacci = summary.fibonacci,
                checksum = summary.checksum,
                bytes = summary.bytes_written,
                "Workload finished"
            );

            let report = GroupReport::collect(&timers, &report_config);
            output::render(&report, report_config.format, std::io::stdout().lock())?;
        }
        Command::InitConfig => {
            let dir = config_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default();
            let storage = ConfigStorage::new(dir);
            storage.save(&config)?;
            println!("{}", storage.path().display());
        }
        Command::ShowConfig => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

/// Resolve the config path and load it; a missing file yields defaults.
fn load_config(path: Option<&Path>) -> Result<(Config, PathBuf)> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => ConfigStorage::new(storage::get_config_dir()?).path(),
    };

    if !path.exists() {
        return Ok((Config::default(), path));
    }

    let config = storage::config::load_file(&path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    Ok((config, path))
}

/// The `--log-level` override wins over the config file and is held to the
/// same level list.
fn resolve_log_level(arg: Option<String>, config: &Config) -> Result<String> {
    let Some(level) = arg else {
        return Ok(config.logging.level.clone());
    };

    let logging = LoggingConfig { level };
    logging.validate().context("Invalid --log-level")?;
    Ok(logging.level)
}

/// Logs go to stderr so reports on stdout stay machine-readable.
fn init_logging(level: &str) -> Result<()> {
    let filter =
        EnvFilter::try_new(level).with_context(|| format!("Invalid log level '{}'", level))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_config_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");

        let (config, resolved) = load_config(Some(&path)).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(resolved, path);
    }

    #[test]
    fn test_load_config_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("custom.json");
        std::fs::write(
            &path,
            r#"{"version":"1.0.0","report":{"format":"csv","include_idle":false}}"#,
        )
        .unwrap();

        let (config, _) = load_config(Some(&path)).unwrap();
        assert_eq!(config.report.format, ReportFormat::Csv);
        assert!(!config.report.include_idle);
    }

    #[test]
    fn test_load_config_invalid_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.json");
        std::fs::write(&path, r#"{"version":"1.0.0","report":{"separator":""}}"#).unwrap();

        let err = load_config(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("Failed to load config"));
    }

    #[test]
    fn test_log_level_override_is_validated() {
        let config = Config::default();

        let err = resolve_log_level(Some("verbose".to_string()), &config).unwrap_err();
        assert!(format!("{:#}", err).contains("Invalid log level 'verbose'"));

        assert_eq!(
            resolve_log_level(Some("debug".to_string()), &config).unwrap(),
            "debug"
        );
    }

    #[test]
    fn test_log_level_falls_back_to_config() {
        let mut config = Config::default();
        config.logging.level = "warn".to_string();

        assert_eq!(resolve_log_level(None, &config).unwrap(), "warn");
    }

    #[test]
    fn test_args_parse_run() {
        let args = Args::try_parse_from([
            "tickwatch", "run", "--depth", "12", "--format", "json", "--hide-idle",
        ])
        .unwrap();

        match args.command {
            Command::Run {
                depth,
                format,
                hide_idle,
                iterations,
                ..
            } => {
                assert_eq!(depth, 12);
                assert_eq!(format, Some(ReportFormat::Json));
                assert!(hide_idle);
                assert_eq!(iterations, 5);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_args_reject_unknown_format() {
        assert!(Args::try_parse_from(["tickwatch", "run", "--format", "xml"]).is_err());
    }
}
