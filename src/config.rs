use crate::event_model::PriorityWidth;
use crate::observability::{LogLevel, LogRotationPolicy};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default identifier attached to logs and metrics.
pub const DEFAULT_WINDOW_ID: &str = "priority-window";

/// Construction-time settings for one priority window.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_window_id")]
    pub window_id: String,
    /// Decay period shared by every key, in milliseconds.
    pub period_ms: u64,
    #[serde(default)]
    pub width: PriorityWidth,
    #[serde(default)]
    pub log_level: LogLevel,
    #[serde(default)]
    pub log_rotation: LogRotationPolicy,
}

fn default_window_id() -> String {
    DEFAULT_WINDOW_ID.to_string()
}

impl WindowConfig {
    /// Config with defaults for everything but the period.
    ///
    /// Periods are kept in whole milliseconds; a fractional period rounds up,
    /// so any positive duration yields a positive `period_ms`.
    pub fn with_period(period: Duration) -> Self {
        let whole_ms = period.as_millis() + u128::from(period.subsec_nanos() % 1_000_000 != 0);
        Self {
            window_id: default_window_id(),
            period_ms: u64::try_from(whole_ms).unwrap_or(u64::MAX),
            width: PriorityWidth::default(),
            log_level: LogLevel::default(),
            log_rotation: LogRotationPolicy::default(),
        }
    }

    pub fn window_id(mut self, window_id: impl Into<String>) -> Self {
        self.window_id = window_id.into();
        self
    }

    pub fn width(mut self, width: PriorityWidth) -> Self {
        self.width = width;
        self
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    /// Rejects settings no window can run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.period_ms == 0 {
            return Err(ConfigError::InvalidPeriod {
                period_ms: self.period_ms,
            });
        }
        if self.window_id.trim().is_empty() {
            return Err(ConfigError::EmptyWindowId);
        }
        Ok(())
    }

    /// Parses and validates a JSON config document.
    pub fn from_json(payload: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(payload).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a JSON config file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let payload = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_ref.to_path_buf(),
            source,
        })?;
        let config: Self =
            serde_json::from_str(&payload).map_err(|source| ConfigError::ParseFile {
                path: path_ref.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }
}

/// Errors surfaced while loading or validating window configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read window config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse window config {path}: {source}")]
    ParseFile {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to parse window config: {0}")]
    Parse(serde_json::Error),
    #[error("decay period must be positive, got {period_ms} ms")]
    InvalidPeriod { period_ms: u64 },
    #[error("window_id must not be empty")]
    EmptyWindowId,
}
