//! JSON view of a resolved configuration for `check-config`.

use pa_config::AgentConfig;
use pa_redact::RejectedWord;
use serde::Serialize;
use std::collections::BTreeMap;

/// Resolved settings safe to print. The API key itself is never included.
#[derive(Debug, Serialize)]
pub struct ConfigSummary {
    pub enabled: bool,
    pub api_key_configured: bool,
    pub hostname: String,
    pub endpoint: String,
    pub log_file: String,
    pub log_level: String,
    pub log_to_console: bool,
    pub enabled_checks: Vec<String>,
    pub check_intervals_secs: BTreeMap<String, u64>,
    pub queue_size: usize,
    pub max_proc_fds: usize,
    pub max_per_message: usize,
    pub allow_real_time: bool,
    pub blacklist: Vec<String>,
    pub scrubber: ScrubberSummary,
    /// Proxy URL with the password masked.
    pub proxy: Option<String>,
    pub statsd: String,
    pub containers: ContainerSummary,
    pub windows: WindowsSummary,
}

#[derive(Debug, Serialize)]
pub struct ScrubberSummary {
    pub enabled: bool,
    pub strip_all_arguments: bool,
    pub sensitive_words: Vec<String>,
    /// Custom words that could not be compiled, with the reason.
    pub rejected_words: Vec<RejectedWord>,
}

#[derive(Debug, Serialize)]
pub struct ContainerSummary {
    pub blacklist: Vec<String>,
    pub whitelist: Vec<String>,
    pub collect_docker_network: bool,
    pub cache_duration_secs: u64,
}

#[derive(Debug, Serialize)]
pub struct WindowsSummary {
    pub args_refresh_interval: i32,
    pub add_new_args: bool,
}

impl From<&AgentConfig> for ConfigSummary {
    fn from(cfg: &AgentConfig) -> Self {
        Self {
            enabled: cfg.enabled,
            api_key_configured: !cfg.api_key.is_empty(),
            hostname: cfg.hostname.clone(),
            endpoint: cfg.api_endpoint.to_string(),
            log_file: cfg.log_file.clone(),
            log_level: cfg.log_level.clone(),
            log_to_console: cfg.log_to_console,
            enabled_checks: cfg.enabled_checks.clone(),
            check_intervals_secs: cfg
                .check_intervals
                .iter()
                .map(|(check, d)| (check.clone(), d.as_secs()))
                .collect(),
            queue_size: cfg.queue_size,
            max_proc_fds: cfg.max_proc_fds,
            max_per_message: cfg.max_per_message,
            allow_real_time: cfg.allow_real_time,
            blacklist: cfg.blacklist.iter().map(|re| re.as_str().to_string()).collect(),
            scrubber: ScrubberSummary {
                enabled: cfg.scrubber.enabled,
                strip_all_arguments: cfg.scrubber.strip_all_arguments,
                sensitive_words: cfg
                    .scrubber
                    .patterns()
                    .iter()
                    .map(|p| p.word().to_string())
                    .collect(),
                rejected_words: cfg.scrubber.rejected().to_vec(),
            },
            proxy: cfg.transport.proxy.as_ref().map(|p| p.display_url()),
            statsd: format!("{}:{}", cfg.statsd_host, cfg.statsd_port),
            containers: ContainerSummary {
                blacklist: cfg.container_blacklist.clone(),
                whitelist: cfg.container_whitelist.clone(),
                collect_docker_network: cfg.collect_docker_network,
                cache_duration_secs: cfg.container_cache_duration.as_secs(),
            },
            windows: WindowsSummary {
                args_refresh_interval: cfg.windows.args_refresh_interval,
                add_new_args: cfg.windows.add_new_args,
            },
        }
    }
}
