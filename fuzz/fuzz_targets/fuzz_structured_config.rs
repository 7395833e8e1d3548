//! Fuzz target for datadog.yaml parsing and resolution.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pa_config::{ConfigResolver, ExternalHostname, HostnameError, HostnameResolver, StructuredConfig};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Keeps the fuzzer from spawning agent processes.
struct NoSpawn;

impl ExternalHostname for NoSpawn {
    fn resolve_external_hostname(
        &self,
        _bin: &Path,
        _args: &[String],
        _env: &[(String, String)],
        _timeout: Duration,
    ) -> Result<String, HostnameError> {
        Ok("fuzz-host".to_string())
    }
}

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(structured) = StructuredConfig::parse("fuzz.yaml", s) {
            let env: HashMap<String, String> = HashMap::new();
            let cfg = ConfigResolver::new(&env)
                .with_hostname_resolver(HostnameResolver::new().with_external(NoSpawn))
                .resolve(None, Some(&structured));
            assert!(cfg.max_per_message <= 100);
        }
    }
});
