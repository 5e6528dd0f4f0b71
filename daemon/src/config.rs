//! Configuration management (TOML)

use crate::error::ConfigError;
use crate::filter::{NameFilter, DEFAULT_PATTERN};
use crate::window::DEFAULT_CAPACITY;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub filter: FilterConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub poll_interval_ms: u64,
    pub window_capacity: usize,
    /// Upper bound on one collector pass; defaults to the poll interval
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Case-insensitive substring matched against process names
    pub pattern: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            poll_interval_ms: 100,
            window_capacity: DEFAULT_CAPACITY,
            sample_timeout_ms: None,
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig {
            pattern: DEFAULT_PATTERN.to_string(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.general.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("poll_interval_ms must be > 0".into()));
        }
        if self.general.window_capacity == 0 {
            return Err(ConfigError::Invalid("window_capacity must be > 0".into()));
        }
        if self.general.sample_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid("sample_timeout_ms must be > 0".into()));
        }
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        directories::ProjectDirs::from("", "", "vmwatch")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.general.poll_interval_ms)
    }

    pub fn sample_timeout(&self) -> Duration {
        Duration::from_millis(
            self.general
                .sample_timeout_ms
                .unwrap_or(self.general.poll_interval_ms),
        )
    }

    pub fn name_filter(&self) -> NameFilter {
        NameFilter::new(&self.filter.pattern)
    }
}
