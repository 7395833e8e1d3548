//! Error types for configuration resolution.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for configuration resolution.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that abort configuration resolution.
///
/// A file that does not exist is not an error; the loaders return `Ok(None)`
/// and resolution continues with the remaining sources. Everything that goes
/// wrong inside a single field is logged and skipped instead.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid INI in config file {path}: {message}")]
    LegacyParse { path: PathBuf, message: String },

    #[error("Invalid YAML in config file {path}: {source}")]
    StructuredParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

impl ConfigError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ConfigError::Io { .. } => 60,
            ConfigError::LegacyParse { .. } => 61,
            ConfigError::StructuredParse { .. } => 62,
        }
    }

    /// Path of the source that failed.
    pub fn path(&self) -> &std::path::Path {
        match self {
            ConfigError::Io { path, .. }
            | ConfigError::LegacyParse { path, .. }
            | ConfigError::StructuredParse { path, .. } => path,
        }
    }
}
