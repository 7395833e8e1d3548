//! Schema for the structured `datadog.yaml` file.
//!
//! Only the keys the process agent reads are modelled; the rest of the file
//! belongs to other agents and is ignored. Every field is optional so that
//! "not present" can be told apart from an explicit value.

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Deserializer};
use std::path::Path;

/// Top level of the structured configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StructuredConfig {
    pub api_key: Option<String>,
    pub log_level: Option<String>,
    /// Whether the process agent should also log to the console.
    pub log_to_console: Option<bool>,
    pub bind_host: Option<String>,
    pub dogstatsd_port: Option<u16>,

    #[serde(rename = "process_config")]
    pub process: ProcessSection,
}

/// The `process_config` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProcessSection {
    /// `"true"` collects processes and containers, `"false"` containers only,
    /// `"disabled"` turns the agent off entirely.
    #[serde(deserialize_with = "scalar_string")]
    pub enabled: Option<String>,
    pub log_file: Option<String>,
    /// Check intervals in seconds.
    pub intervals: Intervals,
    /// Regex patterns that exclude a process when matched.
    pub blacklist_patterns: Vec<String>,
    pub scrub_args: Option<bool>,
    pub custom_sensitive_words: Vec<String>,
    pub strip_proc_arguments: Option<bool>,
    /// Check results buffered in memory while submission fails.
    pub queue_size: Option<i64>,
    /// File descriptors opened at most when collecting connections.
    pub max_proc_fds: Option<i64>,
    pub max_per_message: Option<i64>,
    /// Agent binary used to look up the hostname.
    pub dd_agent_bin: Option<String>,
    /// Environment passed to the hostname lookup, as `KEY=VALUE` entries.
    pub dd_agent_env: Vec<String>,
    pub process_dd_url: Option<String>,
    pub container_blacklist: Vec<String>,
    pub container_whitelist: Vec<String>,
    pub collect_docker_network: Option<bool>,
    /// Container cache lifetime in seconds.
    pub container_cache_duration: Option<u64>,
    pub windows: WindowsSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Intervals {
    pub container: Option<u64>,
    pub container_realtime: Option<u64>,
    pub process: Option<u64>,
    pub process_realtime: Option<u64>,
    pub connections: Option<u64>,
}

impl Intervals {
    /// Intervals that were set, keyed by check name.
    pub fn by_check(&self) -> Vec<(&'static str, u64)> {
        [
            (crate::agent::CHECK_CONTAINER, self.container),
            (crate::agent::CHECK_RT_CONTAINER, self.container_realtime),
            (crate::agent::CHECK_PROCESS, self.process),
            (crate::agent::CHECK_RT_PROCESS, self.process_realtime),
            (crate::agent::CHECK_CONNECTIONS, self.connections),
        ]
        .into_iter()
        .filter_map(|(name, secs)| secs.map(|s| (name, s)))
        .collect()
    }
}

/// Windows-only settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WindowsSection {
    /// Check runs between refreshes of process arguments.
    pub args_refresh_interval: Option<i32>,
    /// Fetch arguments as soon as a new process is seen.
    pub add_new_args: Option<bool>,
}

impl StructuredConfig {
    /// Load `path` if it exists.
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

    /// Parse YAML content. `path` is only used for diagnostics.
    pub fn parse<P: AsRef<Path>>(path: P, content: &str) -> Result<Self> {
        let to_error = |source| ConfigError::StructuredParse {
            path: path.as_ref().to_path_buf(),
            source,
        };
        // An empty or comment-only document is null, not an empty mapping.
        if content.trim().is_empty()
            || serde_yaml::from_str::<serde_yaml::Value>(content).map_err(to_error)?.is_null()
        {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(to_error)
    }
}

/// Accept `enabled: true` as well as `enabled: 'true'`.
fn scalar_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value = Option::<serde_yaml::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_yaml::Value::Null) => Ok(None),
        Some(serde_yaml::Value::String(s)) => Ok(Some(s)),
        Some(serde_yaml::Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(serde_yaml::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected a string or boolean, got {:?}",
            other
        ))),
    }
}
