//! Reader for the legacy `datadog.conf` INI file.
//!
//! Agent 5 deployments keep their settings in sections like `[Main]` and
//! `[process.config]`. All getters take a fallback; a value that is present
//! but unparseable is logged and the fallback is used.

use crate::env::split_list;
use crate::error::{ConfigError, Result};
use ini::{Ini, ParseOption};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Section holding the agent-wide settings.
pub const MAIN_SECTION: &str = "Main";

/// Section holding the process agent settings.
pub const PROCESS_SECTION: &str = "process.config";

/// A parsed legacy configuration file.
#[derive(Debug, Clone)]
pub struct LegacyFile {
    path: PathBuf,
    ini: Ini,
}

impl LegacyFile {
    /// Load `path` if it exists.
    ///
    /// Returns `Ok(None)` when the file is absent and an error when it exists
    /// but cannot be read or parsed.
    pub fn load_if_exists<P: AsRef<Path>>(path: P) -> Result<Option<Self>> {
        let path = path.as_ref();
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::parse(path, &content).map(Some)
    }

    /// Parse INI content. `path` is only used for diagnostics.
    pub fn parse<P: AsRef<Path>>(path: P, content: &str) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        // Windows paths are common in values; backslashes are literal.
        let opt = ParseOption {
            enabled_escape: false,
            ..ParseOption::default()
        };
        let ini = Ini::load_from_str_opt(content, opt).map_err(|e| ConfigError::LegacyParse {
            path: path.clone(),
            message: e.to_string(),
        })?;
        Ok(Self { path, ini })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn has_section(&self, section: &str) -> bool {
        self.ini.section(Some(section)).is_some()
    }

    /// Raw trimmed value, `None` when missing or empty.
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.ini
            .get_from(Some(section), key)
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    pub fn get_string(&self, section: &str, key: &str, default: &str) -> String {
        self.get(section, key).unwrap_or(default).to_string()
    }

    pub fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        match self.get(section, key) {
            None => default,
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!(section, key, value = raw, "not an integer, using default");
                default
            }),
        }
    }

    pub fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        match self.get(section, key) {
            None => default,
            Some(raw) => parse_ini_bool(raw).unwrap_or_else(|| {
                warn!(section, key, value = raw, "not a boolean, using default");
                default
            }),
        }
    }

    /// An integer count of `unit`.
    pub fn get_duration(&self, section: &str, key: &str, unit: Duration, default: Duration) -> Duration {
        match self.get(section, key) {
            None => default,
            Some(raw) => match raw.parse::<u32>() {
                Ok(n) => unit * n,
                Err(_) => {
                    warn!(section, key, value = raw, "not a valid duration, using default");
                    default
                }
            },
        }
    }

    pub fn get_str_list(&self, section: &str, key: &str, delimiter: char, default: &[String]) -> Vec<String> {
        match self.get(section, key) {
            None => default.to_vec(),
            Some(raw) => split_list(raw, delimiter),
        }
    }
}

/// Boolean spellings accepted in INI files.
fn parse_ini_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "t" | "true" | "y" | "yes" | "on" => Some(true),
        "0" | "f" | "false" | "n" | "no" | "off" => Some(false),
        _ => None,
    }
}
