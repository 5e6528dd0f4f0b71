//! Error types for sampling, timekeeping and configuration

use thiserror::Error;

/// Per-entity failure reported by a collector.
///
/// These never abort a tick; the sampling loop logs and skips the entity.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SampleError {
    /// Process vanished or access was denied between enumeration and read
    #[error("process {pid} ({name}) unavailable: {reason}")]
    SourceUnavailable {
        pid: u32,
        name: String,
        reason: String,
    },
}

impl SampleError {
    pub fn unavailable(pid: u32, name: impl Into<String>, reason: impl ToString) -> Self {
        Self::SourceUnavailable {
            pid,
            name: name.into(),
            reason: reason.to_string(),
        }
    }
}

/// Failure to read the wall clock. The affected tick is skipped entirely.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("clock error: {0}")]
pub struct ClockError(pub String);

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
