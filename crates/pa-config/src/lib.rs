//! Configuration resolution for the process agent.
//!
//! The agent reads its settings from up to four places, each overriding the
//! previous one:
//!
//! 1. Built-in defaults
//! 2. The legacy `datadog.conf` INI file
//! 3. The structured `datadog.yaml` file
//! 4. Environment variables
//!
//! [`ConfigResolver`] merges them into one [`AgentConfig`], resolving the
//! outbound proxy and the host identity along the way.
//!
//! # Example
//!
//! ```no_run
//! use pa_config::{ConfigResolver, OsEnv};
//! use std::path::Path;
//!
//! let env = OsEnv;
//! let cfg = ConfigResolver::new(&env)
//!     .load(
//!         Some(Path::new("/etc/dd-agent/datadog.conf")),
//!         Some(Path::new("/etc/datadog-agent/datadog.yaml")),
//!     )
//!     .expect("config");
//! println!("submitting to {}", cfg.api_endpoint);
//! ```

pub mod affirmative;
pub mod agent;
pub mod blacklist;
pub mod env;
pub mod error;
pub mod hostname;
pub mod legacy;
pub mod proxy;
pub mod resolve;
pub mod structured;

pub use affirmative::Affirmative;
pub use agent::{AgentConfig, TransportSettings, WindowsConfig};
pub use blacklist::{compile_blacklist, is_blacklisted};
pub use env::{EnvSource, OsEnv};
pub use error::{ConfigError, Result};
pub use hostname::{
    EcsTaskMetadata, ExternalHostname, HostnameError, HostnameLookup, HostnameResolver,
    SubprocessHostname, TaskMetadataSource,
};
pub use legacy::LegacyFile;
pub use proxy::{resolve_proxy, ProxyError, ProxySelector};
pub use resolve::ConfigResolver;
pub use structured::StructuredConfig;
