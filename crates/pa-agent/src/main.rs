//! process-agent CLI entry point.
//!
//! Resolves the layered agent configuration and exposes it for inspection.

mod exit_codes;
mod logging;
mod summary;

use clap::{Args, Parser, Subcommand};
use exit_codes::ExitCode;
use logging::{LogFormat, LogSettings};
use pa_config::{AgentConfig, ConfigResolver, OsEnv};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use summary::ConfigSummary;

/// Legacy INI configuration read before the structured file.
const DEFAULT_LEGACY_PATH: &str = "/etc/dd-agent/datadog.conf";
const DEFAULT_STRUCTURED_PATH: &str = "/etc/datadog-agent/datadog.yaml";

#[derive(Parser)]
#[command(name = "process-agent")]
#[command(author, version, about = "Process agent configuration tools", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalOpts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct GlobalOpts {
    /// Path to the structured YAML config
    #[arg(long, global = true, env = "PA_CONFIG", default_value = DEFAULT_STRUCTURED_PATH)]
    config: PathBuf,

    /// Path to the legacy INI config
    #[arg(long, global = true, env = "PA_INI", default_value = DEFAULT_LEGACY_PATH)]
    ini: PathBuf,

    /// Log format: human, jsonl
    #[arg(long, global = true, env = "PA_LOG_FORMAT", default_value = "human")]
    log_format: LogFormat,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the resolved configuration as JSON (secrets omitted)
    CheckConfig,

    /// Scrub a command line the way the agent would before reporting it
    Scrub {
        /// Command line to scrub
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        args: Vec<String>,
    },

    /// Print the hostname the agent reports under
    Hostname,
}

fn main() {
    let cli = Cli::parse();
    let code = run(cli);
    std::process::exit(code.as_i32());
}

fn run(cli: Cli) -> ExitCode {
    let env = OsEnv;
    let loaded = tracing::subscriber::with_default(logging::bootstrap_subscriber(), || {
        ConfigResolver::new(&env).load(Some(cli.global.ini.as_path()), Some(cli.global.config.as_path()))
    });
    let cfg = match loaded {
        Ok(cfg) => Arc::new(cfg),
        Err(e) => {
            eprintln!("process-agent: {e}");
            return ExitCode::from(&e);
        }
    };

    let settings = LogSettings::from_config(&cfg, cli.global.log_format);
    if let Some(targets) = logging::init_logging(&settings) {
        tracing::debug!(
            file = ?targets.file,
            stderr = targets.stderr,
            level = %settings.level,
            "logging initialized"
        );
    }
    tracing::info!(
        hostname = %cfg.hostname,
        endpoint = %cfg.api_endpoint,
        enabled = cfg.enabled,
        "configuration resolved"
    );

    match cli.command {
        Commands::CheckConfig => check_config(&cfg),
        Commands::Scrub { args } => print_line(&cfg.scrubber.redact(&args).join(" ")),
        Commands::Hostname => print_line(&cfg.hostname),
    }
}

fn check_config(cfg: &AgentConfig) -> ExitCode {
    match serde_json::to_string_pretty(&ConfigSummary::from(cfg)) {
        Ok(json) => print_line(&json),
        Err(e) => {
            eprintln!("process-agent: failed to serialize config: {e}");
            ExitCode::InternalError
        }
    }
}

fn print_line(line: &str) -> ExitCode {
    let mut out = std::io::stdout().lock();
    match writeln!(out, "{line}").and_then(|_| out.flush()) {
        Ok(()) => ExitCode::Clean,
        Err(e) => {
            eprintln!("process-agent: write failed: {e}");
            ExitCode::InternalError
        }
    }
}
