//! Configuration storage operations

use crate::{models::Config, Result};
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "config.json";

pub struct ConfigStorage {
    config_dir: PathBuf,
}

impl ConfigStorage {
    pub fn new(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    pub fn path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    /// Load `config.json`, falling back to defaults when it is missing or empty.
    pub fn load(&self) -> Result<Config> {
        let config_path = self.path();

        if !config_path.exists() {
            tracing::debug!("No config at {}, using defaults", config_path.display());
            return Ok(Config::default());
        }

        load_file(&config_path)
    }

    pub fn save(&self, config: &Config) -> Result<()> {
        config.validate()?;
        std::fs::create_dir_all(&self.config_dir)?;

        let config_path = self.path();
        let content = serde_json::to_string_pretty(config)?;
        std::fs::write(&config_path, content)?;
        tracing::info!("Saved config to {}", config_path.display());

        Ok(())
    }
}

/// Read and validate a config file at an explicit path.
pub fn load_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)?;

    // Handle empty file case
    if content.trim().is_empty() {
        return Ok(Config::default());
    }

    let config: Config = serde_json::from_str(&content)?;
    config.validate()?;
    tracing::debug!("Loaded config from {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReportFormat;
    use crate::Error;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_returns_defaults_without_writing() {
        let temp_dir = TempDir::new().unwrap();
        let storage = ConfigStorage::new(temp_dir.path().join("tickwatch"));

        let config = storage.load().unwrap();
        assert_eq!(config, Config::default());
        assert!(!storage.path().exists());
    }

    #[test]
    fn test_save_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let storage = ConfigStorage::new(temp_dir.path().join("tickwatch"));

        let mut config = Config::default();
        config.report.format = ReportFormat::Json;
        config.logging.level = "debug".to_string();
        storage.save(&config).unwrap();

        assert!(storage.path().exists());
        assert_eq!(storage.load().unwrap(), config);
    }

    #[test]
    fn test_empty_file_is_default() {
        let temp_dir = TempDir::new().unwrap();
        let storage = ConfigStorage::new(temp_dir.path().to_path_buf());
        std::fs::write(storage.path(), "  \n").unwrap();

        assert_eq!(storage.load().unwrap(), Config::default());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let storage = ConfigStorage::new(temp_dir.path().to_path_buf());
        std::fs::write(
            storage.path(),
            r#"{"version":"1.0.0","logging":{"level":"loud"}}"#,
        )
        .unwrap();

        assert!(matches!(storage.load(), Err(Error::Validation(_))));

        std::fs::write(storage.path(), "{not json").unwrap();
        assert!(matches!(storage.load(), Err(Error::Json(_))));
    }

    #[test]
    fn test_save_rejects_invalid_config() {
        let temp_dir = TempDir::new().unwrap();
        let storage = ConfigStorage::new(temp_dir.path().to_path_buf());

        let mut config = Config::default();
        config.report.separator = String::new();

        assert!(storage.save(&config).is_err());
        assert!(!storage.path().exists());
    }
}
