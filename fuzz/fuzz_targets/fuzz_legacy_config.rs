//! Fuzz target for legacy INI configuration parsing.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pa_config::LegacyFile;
use std::time::Duration;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Should never panic, only return an error
        if let Ok(file) = LegacyFile::parse("fuzz.conf", s) {
            let _ = file.get_str_list("Main", "blacklist", ',', &[]);
            let _ = file.get_duration(
                "Main",
                "process_interval",
                Duration::from_secs(1),
                Duration::from_secs(10),
            );
        }
    }
});
