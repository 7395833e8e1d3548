//! Logging bootstrap for the process agent.
//!
//! Logs go to the configured log file. They are mirrored to stderr when the
//! config asks for console output, and sent there instead when the file
//! cannot be opened. `RUST_LOG` overrides the configured level.

use pa_config::AgentConfig;
use std::fs::{File, OpenOptions};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

/// Crates whose events pass the level filter.
const LOG_TARGETS: &[&str] = &["process_agent", "pa_config", "pa_redact"];

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines (default).
    #[default]
    Human,
    /// One JSON object per line.
    Jsonl,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" | "console" | "pretty" => Ok(LogFormat::Human),
            "jsonl" | "json" => Ok(LogFormat::Jsonl),
            _ => Err(format!("unknown log format: {}", s)),
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Human => write!(f, "human"),
            LogFormat::Jsonl => write!(f, "jsonl"),
        }
    }
}

/// Where and how to log, derived from the resolved config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: String,
    pub file: Option<PathBuf>,
    pub console: bool,
    pub format: LogFormat,
}

impl LogSettings {
    pub fn from_config(cfg: &AgentConfig, format: LogFormat) -> Self {
        let file = (!cfg.log_file.is_empty()).then(|| PathBuf::from(&cfg.log_file));
        Self {
            level: cfg.log_level.clone(),
            file,
            console: cfg.log_to_console,
            format,
        }
    }

    /// Filter directive for our crates, falling back to `info` for levels
    /// the filter does not understand.
    pub fn directive(&self) -> String {
        let level = match self.level.as_str() {
            l @ ("trace" | "debug" | "info" | "warn" | "error" | "off") => l,
            "critical" => "error",
            _ => "info",
        };
        LOG_TARGETS
            .iter()
            .map(|target| format!("{target}={level}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// What [`init_logging`] ended up writing to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogTargets {
    pub file: Option<PathBuf>,
    pub stderr: bool,
}

/// Install the global subscriber.
///
/// Returns `None` if a subscriber was already installed.
pub fn init_logging(settings: &LogSettings) -> Option<LogTargets> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(settings.directive()));

    let file = settings.file.as_deref().and_then(|path| match open_log_file(path) {
        Ok(f) => Some((path.to_path_buf(), f)),
        Err(e) => {
            eprintln!("process-agent: cannot open log file {}: {e}", path.display());
            None
        }
    });

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    let file_path = file.map(|(path, f)| {
        layers.push(layer(settings.format, Mutex::new(f), false));
        path
    });
    let stderr = settings.console || file_path.is_none();
    if stderr {
        layers.push(layer(settings.format, std::io::stderr, std::io::stderr().is_terminal()));
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .ok()?;
    Some(LogTargets {
        file: file_path,
        stderr,
    })
}

/// Stderr subscriber used while the configuration is being resolved.
pub fn bootstrap_subscriber() -> impl tracing::Subscriber + Send + Sync {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(layer(LogFormat::Human, std::io::stderr, false))
        .with(filter)
}

fn layer<W>(format: LogFormat, writer: W, ansi: bool) -> Box<dyn Layer<Registry> + Send + Sync>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    match format {
        LogFormat::Human => fmt::layer()
            .with_writer(writer)
            .with_target(false)
            .with_ansi(ansi)
            .boxed(),
        LogFormat::Jsonl => fmt::layer().json().with_writer(writer).boxed(),
    }
}

fn open_log_file(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}
