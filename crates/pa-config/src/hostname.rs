//! Host identity resolution.
//!
//! The first source that yields a name wins: an explicit override, the task
//! identifier on Fargate, the hostname reported by the main agent, and
//! finally the operating system. Only a failure of the last step is returned
//! to the caller; every other failure is logged and the chain moves on.

use crate::affirmative::Affirmative;
use crate::env::EnvSource;
use serde::Deserialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};

/// Bound on the external hostname lookup.
pub const HOSTNAME_TIMEOUT: Duration = Duration::from_secs(5);

/// Task metadata endpoint reachable from inside a Fargate task.
pub const ECS_TASK_METADATA_URL: &str = "http://169.254.170.2/v2/metadata";

/// Inline script run by the legacy agent interpreter.
const PYTHON_HOSTNAME_SCRIPT: &str = "from utils.hostname import get_hostname; print(get_hostname())";

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Error)]
pub enum HostnameError {
    #[error("failed to run {bin}: {source}")]
    Spawn {
        bin: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{bin} did not exit within {timeout:?}")]
    Timeout { bin: PathBuf, timeout: Duration },

    #[error("{bin} exited with {status}: {stderr}")]
    NonZeroExit {
        bin: PathBuf,
        status: String,
        stderr: String,
    },

    #[error("{bin} printed an empty hostname")]
    EmptyOutput { bin: PathBuf },

    #[error("failed to read the OS hostname: {0}")]
    Os(#[source] std::io::Error),

    #[error("task metadata unavailable: {0}")]
    Metadata(String),
}

/// Runs an external program that prints the hostname.
pub trait ExternalHostname {
    /// Run `bin` with exactly `env` as its environment and return its
    /// trimmed standard output.
    fn resolve_external_hostname(
        &self,
        bin: &Path,
        args: &[String],
        env: &[(String, String)],
        timeout: Duration,
    ) -> Result<String, HostnameError>;
}

/// [`ExternalHostname`] backed by a child process.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubprocessHostname;

impl ExternalHostname for SubprocessHostname {
    fn resolve_external_hostname(
        &self,
        bin: &Path,
        args: &[String],
        env: &[(String, String)],
        timeout: Duration,
    ) -> Result<String, HostnameError> {
        let spawn_error = |source| HostnameError::Spawn {
            bin: bin.to_path_buf(),
            source,
        };

        let mut child = Command::new(bin)
            .args(args)
            .env_clear()
            .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;

        // A child blocked on a full pipe never exits, so read while waiting.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let start = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait().map_err(spawn_error)? {
                break status;
            }
            if start.elapsed() > timeout {
                let _ = child.kill();
                let _ = child.wait();
                return Err(HostnameError::Timeout {
                    bin: bin.to_path_buf(),
                    timeout,
                });
            }
            std::thread::sleep(POLL_INTERVAL);
        };

        let stdout = collect_trimmed(stdout);
        let stderr = collect_trimmed(stderr);

        if !status.success() {
            return Err(HostnameError::NonZeroExit {
                bin: bin.to_path_buf(),
                status: status.to_string(),
                stderr,
            });
        }
        if stdout.is_empty() {
            return Err(HostnameError::EmptyOutput {
                bin: bin.to_path_buf(),
            });
        }
        Ok(stdout)
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    })
}

fn collect_trimmed(reader: Option<JoinHandle<Vec<u8>>>) -> String {
    let buf = reader.and_then(|h| h.join().ok()).unwrap_or_default();
    String::from_utf8_lossy(&buf).trim().to_string()
}

/// Source of the task identifier on serverless container platforms.
pub trait TaskMetadataSource {
    fn task_arn(&self) -> Result<String, HostnameError>;
}

/// Reads `TaskARN` from the ECS task metadata endpoint.
#[derive(Debug, Clone)]
pub struct EcsTaskMetadata {
    pub url: String,
    pub timeout: Duration,
}

impl Default for EcsTaskMetadata {
    fn default() -> Self {
        Self {
            url: ECS_TASK_METADATA_URL.to_string(),
            timeout: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TaskMetadata {
    #[serde(rename = "TaskARN")]
    task_arn: String,
}

impl TaskMetadataSource for EcsTaskMetadata {
    fn task_arn(&self) -> Result<String, HostnameError> {
        let agent = ureq::AgentBuilder::new().timeout(self.timeout).build();
        let response = agent
            .get(&self.url)
            .call()
            .map_err(|e| HostnameError::Metadata(e.to_string()))?;
        let meta: TaskMetadata = response
            .into_json()
            .map_err(|e| HostnameError::Metadata(e.to_string()))?;
        if meta.task_arn.is_empty() {
            return Err(HostnameError::Metadata("empty TaskARN".to_string()));
        }
        Ok(meta.task_arn)
    }
}

/// How to ask the main agent for its hostname.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostnameLookup<'a> {
    /// Agent binary, run as `<bin> hostname`. Preferred when non-empty.
    pub agent_bin: &'a str,
    /// Legacy interpreter, run with an inline script.
    pub agent_py: &'a str,
    /// `KEY=VALUE` entries layered over the process environment.
    pub agent_env: &'a [String],
}

/// The resolution chain with its pluggable external steps.
pub struct HostnameResolver {
    external: Box<dyn ExternalHostname>,
    metadata: Box<dyn TaskMetadataSource>,
    timeout: Duration,
}

impl Default for HostnameResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl HostnameResolver {
    pub fn new() -> Self {
        Self {
            external: Box::new(SubprocessHostname),
            metadata: Box::new(EcsTaskMetadata::default()),
            timeout: HOSTNAME_TIMEOUT,
        }
    }

    pub fn with_external(mut self, external: impl ExternalHostname + 'static) -> Self {
        self.external = Box::new(external);
        self
    }

    pub fn with_metadata(mut self, metadata: impl TaskMetadataSource + 'static) -> Self {
        self.metadata = Box::new(metadata);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolve the host identity.
    ///
    /// `env` is consulted for the serverless marker. The child process gets
    /// the real process environment with `lookup.agent_env` on top.
    pub fn resolve(
        &self,
        override_name: Option<&str>,
        lookup: &HostnameLookup<'_>,
        env: &dyn EnvSource,
    ) -> Result<String, HostnameError> {
        if let Some(name) = override_name.map(str::trim).filter(|n| !n.is_empty()) {
            debug!(hostname = name, "using configured hostname");
            return Ok(name.to_string());
        }

        if is_fargate(env) {
            match self.metadata.task_arn() {
                Ok(arn) => return Ok(format!("fargate_task:{arn}")),
                Err(e) => info!(error = %e, "could not read Fargate task metadata, falling back"),
            }
        }

        match self.from_agent(lookup) {
            Some(Ok(name)) => return Ok(name),
            Some(Err(e)) => info!(error = %e, "agent hostname lookup failed, falling back to OS hostname"),
            None => debug!("no agent configured for hostname lookup"),
        }

        os_hostname()
    }

    fn from_agent(&self, lookup: &HostnameLookup<'_>) -> Option<Result<String, HostnameError>> {
        let (bin, args) = if !lookup.agent_bin.is_empty() {
            (lookup.agent_bin, vec!["hostname".to_string()])
        } else if !lookup.agent_py.is_empty() {
            (
                lookup.agent_py,
                vec!["-c".to_string(), PYTHON_HOSTNAME_SCRIPT.to_string()],
            )
        } else {
            return None;
        };

        let process_env = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)));
        let env = merge_env(lookup.agent_env, process_env);
        Some(
            self.external
                .resolve_external_hostname(Path::new(bin), &args, &env, self.timeout),
        )
    }
}

impl std::fmt::Debug for HostnameResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostnameResolver")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// `overrides` (as `KEY=VALUE`) followed by the `base` entries they do not
/// shadow. Entries without `=` are ignored.
pub fn merge_env<I>(overrides: &[String], base: I) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut merged: Vec<(String, String)> = Vec::new();
    for entry in overrides {
        let Some((key, value)) = entry.split_once('=') else {
            continue;
        };
        if key.is_empty() || merged.iter().any(|(k, _)| k == key) {
            continue;
        }
        merged.push((key.to_string(), value.to_string()));
    }
    let shadowed = merged.len();
    for (key, value) in base {
        if !merged[..shadowed].iter().any(|(k, _)| *k == key) {
            merged.push((key, value));
        }
    }
    merged
}

/// Hostname as reported by the operating system.
pub fn os_hostname() -> Result<String, HostnameError> {
    let name = hostname::get().map_err(HostnameError::Os)?;
    Ok(name.to_string_lossy().to_string())
}

fn is_fargate(env: &dyn EnvSource) -> bool {
    Affirmative::parse_opt(env.var("ECS_FARGATE").as_deref()).is_true()
}
