//! The resolved process agent configuration.

use crate::proxy::ProxySelector;
use pa_redact::Scrubber;
use regex::Regex;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::error;
use url::Url;

pub const CHECK_PROCESS: &str = "process";
pub const CHECK_RT_PROCESS: &str = "rtprocess";
pub const CHECK_CONTAINER: &str = "container";
pub const CHECK_RT_CONTAINER: &str = "rtcontainer";
pub const CHECK_CONNECTIONS: &str = "connections";

/// Checks enabled when process collection is on.
pub const PROCESS_CHECKS: &[&str] = &[CHECK_PROCESS, CHECK_RT_PROCESS];

/// Checks enabled when only containers are collected.
pub const CONTAINER_CHECKS: &[&str] = &[CHECK_CONTAINER, CHECK_RT_CONTAINER];

pub const DEFAULT_ENDPOINT: &str = "https://process.datadoghq.com";

/// Hard ceiling on items per outbound message.
pub const MAX_MESSAGE_BATCH: usize = 100;

/// Interval used for a check with no configured interval.
pub const FALLBACK_CHECK_INTERVAL: Duration = Duration::from_secs(10);

pub const DEFAULT_LOG_FILE: &str = "/var/log/datadog/process-agent.log";
pub const DEFAULT_AGENT_PY: &str = "/opt/datadog-agent/embedded/bin/python";
pub const DEFAULT_AGENT_PY_ENV: &str = "PYTHONPATH=/opt/datadog-agent/agent";
pub const DEFAULT_AGENT_BIN: &str = "/opt/datadog-agent/bin/agent/agent";

/// Images excluded by default when running inside Kubernetes.
pub const DEFAULT_KUBE_BLACKLIST: &[&str] = &[
    "image:gcr.io/google_containers/pause.*",
    "image:openshift/origin-pod",
];

/// Refresh interval value meaning "never refresh".
pub const ARGS_REFRESH_DISABLED: i32 = -1;

/// Windows-specific process collection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowsConfig {
    /// Check runs between refreshes of command-line arguments. Used as a
    /// modulo divisor, so never zero after resolution.
    pub args_refresh_interval: i32,
    /// Fetch arguments immediately for newly seen processes.
    pub add_new_args: bool,
}

impl Default for WindowsConfig {
    fn default() -> Self {
        Self {
            // With the default 20s check interval this refreshes every 5m.
            args_refresh_interval: 15,
            add_new_args: true,
        }
    }
}

/// Settings for the HTTP transport used by the submission layer.
#[derive(Debug, Clone)]
pub struct TransportSettings {
    pub max_idle_conns: usize,
    pub idle_conn_timeout: Duration,
    pub dial_timeout: Duration,
    pub keep_alive: Duration,
    pub tls_handshake_timeout: Duration,
    pub response_header_timeout: Duration,
    pub expect_continue_timeout: Duration,
    pub proxy: Option<ProxySelector>,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            max_idle_conns: 5,
            idle_conn_timeout: Duration::from_secs(90),
            dial_timeout: Duration::from_secs(10),
            keep_alive: Duration::from_secs(10),
            tls_handshake_timeout: Duration::from_secs(5),
            response_header_timeout: Duration::from_secs(5),
            expect_continue_timeout: Duration::from_secs(1),
            proxy: None,
        }
    }
}

/// Configuration snapshot consumed by every check and by submission.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub enabled: bool,
    /// First of the configured API keys; empty when no source set one.
    pub api_key: String,
    pub hostname: String,
    pub api_endpoint: Url,

    pub log_file: String,
    pub log_level: String,
    pub log_to_console: bool,

    pub queue_size: usize,
    pub max_proc_fds: usize,
    /// Items per outbound message, at most [`MAX_MESSAGE_BATCH`].
    pub max_per_message: usize,
    pub allow_real_time: bool,

    /// Processes whose command line matches are skipped entirely.
    pub blacklist: Vec<Regex>,
    pub scrubber: Scrubber,
    pub transport: TransportSettings,

    /// Interpreter and environment of the legacy agent, for hostname lookup.
    pub agent_py: String,
    pub agent_py_env: Vec<String>,
    /// Agent binary for hostname lookup; preferred over `agent_py` when set.
    pub agent_bin: String,

    pub statsd_host: String,
    pub statsd_port: u16,

    pub enabled_checks: Vec<String>,
    pub check_intervals: BTreeMap<String, Duration>,

    pub container_blacklist: Vec<String>,
    pub container_whitelist: Vec<String>,
    pub collect_docker_network: bool,
    pub container_cache_duration: Duration,

    pub windows: WindowsConfig,
}

impl AgentConfig {
    /// Hard-coded defaults.
    ///
    /// `containers_accessible` says whether the host can list containers;
    /// the agent then starts enabled in container-only mode.
    pub fn defaults(containers_accessible: bool) -> Self {
        let check_intervals = [
            (CHECK_PROCESS, 10),
            (CHECK_RT_PROCESS, 2),
            (CHECK_CONTAINER, 10),
            (CHECK_RT_CONTAINER, 2),
            (CHECK_CONNECTIONS, 10),
        ]
        .into_iter()
        .map(|(name, secs)| (name.to_string(), Duration::from_secs(secs)))
        .collect();

        Self {
            enabled: containers_accessible,
            api_key: String::new(),
            hostname: String::new(),
            api_endpoint: default_endpoint(),
            log_file: DEFAULT_LOG_FILE.to_string(),
            log_level: "info".to_string(),
            log_to_console: false,
            queue_size: 20,
            max_proc_fds: 200,
            max_per_message: MAX_MESSAGE_BATCH,
            allow_real_time: true,
            blacklist: Vec::new(),
            scrubber: Scrubber::new(),
            transport: TransportSettings::default(),
            agent_py: DEFAULT_AGENT_PY.to_string(),
            agent_py_env: vec![DEFAULT_AGENT_PY_ENV.to_string()],
            agent_bin: String::new(),
            statsd_host: "127.0.0.1".to_string(),
            statsd_port: 8125,
            enabled_checks: to_owned_checks(CONTAINER_CHECKS),
            check_intervals,
            container_blacklist: Vec::new(),
            container_whitelist: Vec::new(),
            collect_docker_network: true,
            container_cache_duration: Duration::from_secs(10),
            windows: WindowsConfig::default(),
        }
    }

    pub fn check_is_enabled(&self, check: &str) -> bool {
        self.enabled_checks.iter().any(|c| c == check)
    }

    /// Interval for `check`, falling back to 10s for unknown names.
    pub fn check_interval(&self, check: &str) -> Duration {
        match self.check_intervals.get(check) {
            Some(d) => *d,
            None => {
                error!(check, "missing check interval, you must set a default");
                FALLBACK_CHECK_INTERVAL
            }
        }
    }

    /// Register more sensitive words while the config is still uniquely owned.
    pub fn add_custom_words<I, S>(&mut self, words: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.scrubber.add_custom_words(words);
    }

    /// Switch to process collection (processes and containers).
    pub(crate) fn enable_process_checks(&mut self) {
        self.enabled = true;
        self.enabled_checks = to_owned_checks(PROCESS_CHECKS);
    }

    /// Switch to container-only collection.
    pub(crate) fn enable_container_checks(&mut self) {
        self.enabled = true;
        self.enabled_checks = to_owned_checks(CONTAINER_CHECKS);
    }
}

fn to_owned_checks(checks: &[&str]) -> Vec<String> {
    checks.iter().map(|c| c.to_string()).collect()
}

fn default_endpoint() -> Url {
    Url::parse(DEFAULT_ENDPOINT).expect("default endpoint is a valid URL")
}
