//! Layered configuration resolution.
//!
//! Resolution order (later stages win):
//! defaults → legacy `datadog.conf` → structured `datadog.yaml` → environment.
//!
//! Each stage only touches the fields its source explicitly sets. A field
//! with an invalid value is logged and keeps its previous value; only a
//! source file that exists but cannot be read or parsed aborts resolution.

use crate::affirmative::Affirmative;
use crate::agent::{
    AgentConfig, ARGS_REFRESH_DISABLED, CHECK_CONNECTIONS, DEFAULT_AGENT_BIN,
    DEFAULT_KUBE_BLACKLIST, MAX_MESSAGE_BATCH,
};
use crate::blacklist::compile_blacklist;
use crate::env::{split_list, EnvSource};
use crate::error::Result;
use crate::hostname::{HostnameLookup, HostnameResolver};
use crate::legacy::{LegacyFile, MAIN_SECTION, PROCESS_SECTION};
use crate::proxy::{proxy_from_env, proxy_from_legacy, ProxySelector};
use crate::structured::StructuredConfig;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

const ENV_KUBERNETES: &str = "KUBERNETES_SERVICE_HOST";

/// Builds an [`AgentConfig`] from every configuration source.
pub struct ConfigResolver<'e> {
    env: &'e dyn EnvSource,
    containers_accessible: bool,
    hostnames: HostnameResolver,
    extra_words: Vec<String>,
}

impl<'e> ConfigResolver<'e> {
    pub fn new(env: &'e dyn EnvSource) -> Self {
        Self {
            env,
            containers_accessible: false,
            hostnames: HostnameResolver::new(),
            extra_words: Vec::new(),
        }
    }

    /// Whether the host can list containers, which enables the agent by
    /// default in container-only mode.
    pub fn containers_accessible(mut self, accessible: bool) -> Self {
        self.containers_accessible = accessible;
        self
    }

    pub fn with_hostname_resolver(mut self, hostnames: HostnameResolver) -> Self {
        self.hostnames = hostnames;
        self
    }

    /// Sensitive words added after every source has been applied.
    pub fn add_custom_words<I, S>(&mut self, words: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extra_words
            .extend(words.into_iter().map(|w| w.as_ref().to_string()));
    }

    /// Load whichever of the two files exist and resolve.
    pub fn load(&self, legacy_path: Option<&Path>, structured_path: Option<&Path>) -> Result<AgentConfig> {
        let legacy = legacy_path
            .map(LegacyFile::load_if_exists)
            .transpose()?
            .flatten();
        let structured = structured_path
            .map(StructuredConfig::load_if_exists)
            .transpose()?
            .flatten();
        Ok(self.resolve(legacy.as_ref(), structured.as_ref()))
    }

    /// Resolve from already-parsed sources.
    pub fn resolve(&self, legacy: Option<&LegacyFile>, structured: Option<&StructuredConfig>) -> AgentConfig {
        let mut cfg = self.defaults();
        let mut proxy = None;

        if let Some(file) = legacy {
            merge_legacy(&mut cfg, &mut proxy, file);
        }
        if let Some(sc) = structured {
            merge_structured(&mut cfg, sc);
        }
        self.merge_env(&mut cfg, &mut proxy);
        self.finalize(&mut cfg, proxy);
        cfg
    }

    fn defaults(&self) -> AgentConfig {
        let mut cfg = AgentConfig::defaults(self.containers_accessible);
        if self.env.non_empty(ENV_KUBERNETES).is_some() {
            cfg.container_blacklist = DEFAULT_KUBE_BLACKLIST.iter().map(|s| s.to_string()).collect();
        }
        cfg
    }

    fn merge_env(&self, cfg: &mut AgentConfig, proxy: &mut Option<ProxySelector>) {
        let env = self.env;

        apply_enabled(
            cfg,
            Affirmative::parse_opt(env.var("DD_PROCESS_AGENT_ENABLED").as_deref()),
            "DD_PROCESS_AGENT_ENABLED",
        );

        if let Some(v) = env.non_empty("DD_HOSTNAME") {
            info!("overriding hostname from env DD_HOSTNAME value");
            cfg.hostname = v.trim().to_string();
        }

        if let Some((v, source)) = env.preferred("DD_API_KEY", "API_KEY") {
            if let Some(key) = first_api_key(&v) {
                info!(source, "overriding API key from environment");
                cfg.api_key = key;
            }
        }

        if let Some((v, source)) = env.preferred("DD_LOG_LEVEL", "LOG_LEVEL") {
            debug!(source, level = %v, "log level from environment");
            cfg.log_level = v;
        }
        if let Some((v, _)) = env.preferred("DD_LOGS_STDOUT", "LOG_TO_CONSOLE") {
            Affirmative::parse(&v).apply_to(&mut cfg.log_to_console);
        }

        match proxy_from_env(env) {
            Ok(Some(p)) => {
                info!(proxy = %p.display_url(), "using proxy from environment");
                *proxy = Some(p);
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "invalid proxy settings in environment, ignoring"),
        }

        if let Some(v) = env.non_empty("DD_PROCESS_AGENT_URL") {
            set_endpoint(cfg, &v, "DD_PROCESS_AGENT_URL");
        }

        if let Some(v) = env.var("DD_SCRUB_ARGS") {
            Affirmative::parse(&v).apply_to(&mut cfg.scrubber.enabled);
        }
        if let Some(v) = env.non_empty("DD_CUSTOM_SENSITIVE_WORDS") {
            cfg.scrubber.add_custom_words(split_list(&v, ','));
        }
        if Affirmative::parse_opt(env.var("DD_STRIP_PROCESS_ARGS").as_deref()).is_true() {
            cfg.scrubber.strip_all_arguments = true;
        }

        if let Some(v) = env.non_empty("DD_AGENT_PY") {
            cfg.agent_py = v;
        }
        if let Some(v) = env.non_empty("DD_AGENT_PY_ENV") {
            cfg.agent_py_env = split_list(&v, ',');
        }

        if let Some(v) = env.non_empty("DD_DOGSTATSD_PORT") {
            match v.trim().parse::<u16>() {
                Ok(port) => cfg.statsd_port = port,
                Err(_) => warn!(value = %v, "DD_DOGSTATSD_PORT should be a port number, ignoring"),
            }
        }
        if let Some(v) = env.non_empty("DD_BIND_HOST") {
            cfg.statsd_host = v;
        }

        if let Some(v) = env.var("DD_COLLECT_DOCKER_NETWORK") {
            Affirmative::parse(&v).apply_to(&mut cfg.collect_docker_network);
        }
        if let Some(v) = env.non_empty("DD_CONTAINER_BLACKLIST") {
            cfg.container_blacklist = split_list(&v, ',');
        }
        if let Some(v) = env.non_empty("DD_CONTAINER_WHITELIST") {
            cfg.container_whitelist = split_list(&v, ',');
        }
        if let Some(v) = env.non_empty("DD_CONTAINER_CACHE_DURATION") {
            match v.trim().parse::<u64>() {
                Ok(secs) => cfg.container_cache_duration = Duration::from_secs(secs),
                Err(_) => warn!(value = %v, "DD_CONTAINER_CACHE_DURATION should be seconds, ignoring"),
            }
        }

        if let Some(v) = env.non_empty("DD_PROCESS_AGENT_QUEUE_SIZE") {
            if let Some(n) = parse_count("DD_PROCESS_AGENT_QUEUE_SIZE", &v) {
                cfg.queue_size = n;
            }
        }
        if let Some(v) = env.non_empty("DD_PROCESS_AGENT_MAX_PER_MESSAGE") {
            match v.trim().parse::<i64>() {
                Ok(n) => set_max_per_message(cfg, n, "DD_PROCESS_AGENT_MAX_PER_MESSAGE"),
                Err(_) => warn!(value = %v, "DD_PROCESS_AGENT_MAX_PER_MESSAGE should be a number, ignoring"),
            }
        }

        if let Some(v) = env.non_empty("DD_PROCESS_AGENT_WINDOWS_ARGS_REFRESH_INTERVAL") {
            match v.trim().parse::<i32>() {
                Ok(n) => cfg.windows.args_refresh_interval = n,
                Err(_) => warn!(value = %v, "windows args refresh interval should be a number, ignoring"),
            }
        }
        if let Some(v) = env.var("DD_PROCESS_AGENT_WINDOWS_ADD_NEW_ARGS") {
            Affirmative::parse(&v).apply_to(&mut cfg.windows.add_new_args);
        }

        if Affirmative::parse_opt(env.var("DD_CONNECTIONS_CHECK").as_deref()).is_true()
            && !cfg.check_is_enabled(CHECK_CONNECTIONS)
        {
            cfg.enabled_checks.push(CHECK_CONNECTIONS.to_string());
        }
    }

    fn finalize(&self, cfg: &mut AgentConfig, proxy: Option<ProxySelector>) {
        if !self.extra_words.is_empty() {
            cfg.scrubber.add_custom_words(&self.extra_words);
        }

        cfg.log_level = normalize_log_level(&cfg.log_level);

        let resolved = {
            let lookup = HostnameLookup {
                agent_bin: &cfg.agent_bin,
                agent_py: &cfg.agent_py,
                agent_env: &cfg.agent_py_env,
            };
            self.hostnames.resolve(Some(cfg.hostname.as_str()), &lookup, self.env)
        };
        match resolved {
            Ok(name) => cfg.hostname = name,
            Err(e) => warn!(error = %e, "could not determine hostname"),
        }

        if proxy.is_some() {
            cfg.transport.proxy = proxy;
        }

        // Used as a modulo divisor.
        if cfg.windows.args_refresh_interval == 0 {
            warn!("windows args refresh interval was set to 0, disabling argument collection");
            cfg.windows.args_refresh_interval = ARGS_REFRESH_DISABLED;
        }
    }
}

impl std::fmt::Debug for ConfigResolver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigResolver")
            .field("containers_accessible", &self.containers_accessible)
            .field("hostnames", &self.hostnames)
            .field("extra_words", &self.extra_words)
            .finish_non_exhaustive()
    }
}

fn merge_legacy(cfg: &mut AgentConfig, proxy: &mut Option<ProxySelector>, file: &LegacyFile) {
    if !file.has_section(MAIN_SECTION) {
        debug!(path = %file.path().display(), "no [Main] section, skipping legacy config");
        return;
    }

    match file.get(MAIN_SECTION, "api_key").and_then(first_api_key) {
        Some(key) => cfg.api_key = key,
        None => warn!(path = %file.path().display(), "no api_key in [Main]"),
    }
    cfg.log_level = file
        .get_string(MAIN_SECTION, "log_level", &cfg.log_level)
        .to_lowercase();

    match proxy_from_legacy(file) {
        Ok(p) => *proxy = p,
        Err(e) => {
            warn!(error = %e, "invalid proxy settings, not using a proxy");
            *proxy = None;
        }
    }

    apply_enabled(
        cfg,
        Affirmative::parse_opt(file.get(MAIN_SECTION, "process_agent_enabled")),
        "process_agent_enabled",
    );

    cfg.statsd_host = file.get_string(MAIN_SECTION, "bind_host", &cfg.statsd_host);
    // Shorthand for bind_host = 0.0.0.0.
    if Affirmative::parse_opt(file.get(MAIN_SECTION, "non_local_traffic")).is_true() {
        cfg.statsd_host = "0.0.0.0".to_string();
    }
    let port = file.get_int(MAIN_SECTION, "dogstatsd_port", i64::from(cfg.statsd_port));
    match u16::try_from(port) {
        Ok(port) => cfg.statsd_port = port,
        Err(_) => warn!(port, "dogstatsd_port out of range, ignoring"),
    }

    let ns = PROCESS_SECTION;
    if let Some(raw) = file.get(ns, "endpoint") {
        set_endpoint(cfg, raw, "endpoint");
    }
    if let Some(raw) = file.get(ns, "queue_size") {
        if let Some(n) = parse_count("queue_size", raw) {
            cfg.queue_size = n;
        }
    }
    if let Some(raw) = file.get(ns, "max_proc_fds") {
        if let Some(n) = parse_count("max_proc_fds", raw) {
            cfg.max_proc_fds = n;
        }
    }
    cfg.allow_real_time = file.get_bool(ns, "allow_real_time", cfg.allow_real_time);
    cfg.log_file = file.get_string(ns, "log_file", &cfg.log_file);
    cfg.agent_py = file.get_string(ns, "dd_agent_py", &cfg.agent_py);
    cfg.agent_py_env = file.get_str_list(ns, "dd_agent_py_env", ',', &cfg.agent_py_env);

    if let Some(raw) = file.get(ns, "blacklist") {
        cfg.blacklist = compile_blacklist(split_list(raw, ','));
    }

    cfg.scrubber.enabled = file.get_bool(ns, "scrub_args", cfg.scrubber.enabled);
    cfg.scrubber
        .add_custom_words(file.get_str_list(ns, "custom_sensitive_words", ',', &[]));
    cfg.scrubber.strip_all_arguments =
        file.get_bool(ns, "strip_proc_arguments", cfg.scrubber.strip_all_arguments);

    if file.get(ns, "proc_limit").is_some() {
        let limit = file.get_int(ns, "proc_limit", cfg.max_per_message as i64);
        set_max_per_message(cfg, limit, "proc_limit");
    }

    for (check, current) in cfg.check_intervals.iter_mut() {
        let key = format!("{check}_interval");
        let interval = file.get_duration(ns, &key, Duration::from_secs(1), *current);
        if interval.is_zero() {
            warn!(check = %check, "check interval of 0 ignored");
        } else if interval != *current {
            info!(check = %check, ?interval, "overriding check interval");
            *current = interval;
        }
    }

    cfg.collect_docker_network = file.get_bool(ns, "collect_docker_network", cfg.collect_docker_network);
    cfg.container_blacklist = file.get_str_list(ns, "container_blacklist", ',', &cfg.container_blacklist);
    cfg.container_whitelist = file.get_str_list(ns, "container_whitelist", ',', &cfg.container_whitelist);
    cfg.container_cache_duration = file.get_duration(
        ns,
        "container_cache_duration",
        Duration::from_secs(1),
        cfg.container_cache_duration,
    );

    let refresh = file.get_int(
        ns,
        "windows_args_refresh_interval",
        i64::from(cfg.windows.args_refresh_interval),
    );
    match i32::try_from(refresh) {
        Ok(n) => cfg.windows.args_refresh_interval = n,
        Err(_) => warn!(refresh, "windows_args_refresh_interval out of range, ignoring"),
    }
    cfg.windows.add_new_args = file.get_bool(ns, "windows_add_new_args", cfg.windows.add_new_args);
}

fn merge_structured(cfg: &mut AgentConfig, sc: &StructuredConfig) {
    let p = &sc.process;

    if let Some(key) = sc.api_key.as_deref().and_then(first_api_key) {
        cfg.api_key = key;
    }

    match p.enabled.as_deref().map(str::trim) {
        None | Some("") => {}
        Some(v) if Affirmative::parse(v).is_true() => cfg.enable_process_checks(),
        Some(v) if v.eq_ignore_ascii_case("disabled") => {
            info!("process agent disabled by process_config.enabled");
            cfg.enabled = false;
        }
        // Any other explicit value still collects containers.
        Some(_) => cfg.enable_container_checks(),
    }

    if let Some(raw) = non_empty(&p.process_dd_url) {
        set_endpoint(cfg, raw, "process_dd_url");
    }
    if let Some(v) = sc.log_to_console {
        cfg.log_to_console = v;
    }
    if let Some(level) = non_empty(&sc.log_level) {
        cfg.log_level = level.to_string();
    }
    if let Some(file) = non_empty(&p.log_file) {
        cfg.log_file = file.to_string();
    }

    for (check, secs) in p.intervals.by_check() {
        if secs == 0 {
            continue;
        }
        let interval = Duration::from_secs(secs);
        info!(check, ?interval, "overriding check interval");
        cfg.check_intervals.insert(check.to_string(), interval);
    }

    if !p.blacklist_patterns.is_empty() {
        cfg.blacklist = compile_blacklist(&p.blacklist_patterns);
    }

    if let Some(enabled) = p.scrub_args {
        cfg.scrubber.enabled = enabled;
    }
    cfg.scrubber.add_custom_words(&p.custom_sensitive_words);
    if let Some(strip) = p.strip_proc_arguments {
        cfg.scrubber.strip_all_arguments = strip;
    }

    if let Some(n) = p.queue_size.and_then(positive) {
        cfg.queue_size = n;
    }
    if let Some(n) = p.max_proc_fds.and_then(positive) {
        cfg.max_proc_fds = n;
    }
    if let Some(n) = p.max_per_message {
        set_max_per_message(cfg, n, "max_per_message");
    }

    // Newer deployments always ship the agent binary.
    cfg.agent_bin = non_empty(&p.dd_agent_bin)
        .unwrap_or(DEFAULT_AGENT_BIN)
        .to_string();
    if !p.dd_agent_env.is_empty() {
        cfg.agent_py_env = p.dd_agent_env.clone();
    }

    if let Some(v) = p.collect_docker_network {
        cfg.collect_docker_network = v;
    }
    if !p.container_blacklist.is_empty() {
        cfg.container_blacklist = p.container_blacklist.clone();
    }
    if !p.container_whitelist.is_empty() {
        cfg.container_whitelist = p.container_whitelist.clone();
    }
    if let Some(secs) = p.container_cache_duration {
        cfg.container_cache_duration = Duration::from_secs(secs);
    }

    if let Some(n) = p.windows.args_refresh_interval {
        cfg.windows.args_refresh_interval = n;
    }
    if let Some(v) = p.windows.add_new_args {
        cfg.windows.add_new_args = v;
    }

    if let Some(host) = non_empty(&sc.bind_host) {
        cfg.statsd_host = host.to_string();
    }
    if let Some(port) = sc.dogstatsd_port {
        cfg.statsd_port = port;
    }
}

/// Apply a tri-state enable flag from the legacy file or the environment.
///
/// An explicit false turns the agent off but leaves the check set alone.
fn apply_enabled(cfg: &mut AgentConfig, value: Affirmative, source: &str) {
    match value {
        Affirmative::True => {
            info!(source, "process collection enabled");
            cfg.enable_process_checks();
        }
        Affirmative::False => {
            info!(source, "process agent disabled");
            cfg.enabled = false;
        }
        Affirmative::Unset => {}
    }
}

fn set_endpoint(cfg: &mut AgentConfig, raw: &str, source: &str) {
    match Url::parse(raw.trim()) {
        Ok(url) => {
            info!(source, endpoint = %url, "overriding API endpoint");
            cfg.api_endpoint = url;
        }
        Err(e) => warn!(source, value = raw, error = %e, "invalid endpoint URL, ignoring"),
    }
}

fn set_max_per_message(cfg: &mut AgentConfig, value: i64, source: &str) {
    if value <= 0 {
        warn!(source, value, "items per message must be positive, ignoring");
        return;
    }
    match usize::try_from(value) {
        Ok(n) if n <= MAX_MESSAGE_BATCH => cfg.max_per_message = n,
        _ => {
            warn!(
                source,
                value,
                max = MAX_MESSAGE_BATCH,
                "configured items per message exceeds the maximum, clamping"
            );
            cfg.max_per_message = MAX_MESSAGE_BATCH;
        }
    }
}

/// First entry of a comma-separated key list.
fn first_api_key(raw: &str) -> Option<String> {
    raw.split(',')
        .map(str::trim)
        .find(|k| !k.is_empty())
        .map(str::to_string)
}

fn normalize_log_level(level: &str) -> String {
    let level = level.trim().to_lowercase();
    if level == "warning" {
        "warn".to_string()
    } else {
        level
    }
}

fn parse_count(key: &str, raw: &str) -> Option<usize> {
    match raw.trim().parse::<i64>() {
        Ok(n) => {
            let count = positive(n);
            if count.is_none() {
                warn!(key, value = raw, "must be positive, ignoring");
            }
            count
        }
        Err(_) => {
            warn!(key, value = raw, "not an integer, ignoring");
            None
        }
    }
}

fn positive(n: i64) -> Option<usize> {
    usize::try_from(n).ok().filter(|n| *n > 0)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
