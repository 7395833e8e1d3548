//! Exit codes for the process-agent CLI.
//!
//! Configuration failures reuse [`ConfigError::code`] so the status alone
//! tells which source was broken.

use pa_config::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Clean = 0,

    /// Writing the command output failed.
    InternalError = 20,

    /// A configuration file exists but could not be read.
    ConfigIo = 60,
    /// The legacy INI file is malformed.
    ConfigLegacyParse = 61,
    /// The structured YAML file is malformed.
    ConfigStructuredParse = 62,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl From<&ConfigError> for ExitCode {
    fn from(err: &ConfigError) -> Self {
        match err {
            ConfigError::Io { .. } => ExitCode::ConfigIo,
            ConfigError::LegacyParse { .. } => ExitCode::ConfigLegacyParse,
            ConfigError::StructuredParse { .. } => ExitCode::ConfigStructuredParse,
        }
    }
}
