//! Read access to environment variables.
//!
//! Resolution only ever looks variables up by name. Going through
//! [`EnvSource`] lets tests supply a plain map instead of touching the
//! process environment.

use std::collections::HashMap;

/// A lookup-by-name view of environment variables.
pub trait EnvSource {
    fn var(&self, name: &str) -> Option<String>;

    /// The variable's value, treating an empty string as absent.
    fn non_empty(&self, name: &str) -> Option<String> {
        self.var(name).filter(|v| !v.is_empty())
    }

    /// Value of `preferred` if set, otherwise of `legacy`, along with the
    /// name of the variable it came from.
    fn preferred<'a>(&self, preferred: &'a str, legacy: &'a str) -> Option<(String, &'a str)> {
        if let Some(v) = self.non_empty(preferred) {
            return Some((v, preferred));
        }
        self.non_empty(legacy).map(|v| (v, legacy))
    }
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsEnv;

impl EnvSource for OsEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl EnvSource for HashMap<&str, &str> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).map(|v| v.to_string())
    }
}

/// Split a delimited list, trimming entries and dropping empty ones.
pub fn split_list(value: &str, delimiter: char) -> Vec<String> {
    value
        .split(delimiter)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
