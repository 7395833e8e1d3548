//! Fuzz target for custom sensitive words and command-line scrubbing.
//!
//! Arbitrary words must compile or be skipped, and redaction must never
//! panic.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use pa_redact::Scrubber;

#[derive(Arbitrary, Debug)]
struct Input {
    words: Vec<String>,
    cmdline: Vec<String>,
    strip_all_arguments: bool,
}

fuzz_target!(|input: Input| {
    let mut scrubber = Scrubber::new();
    scrubber.strip_all_arguments = input.strip_all_arguments;
    scrubber.add_custom_words(&input.words);

    let out = scrubber.redact(&input.cmdline);
    if input.strip_all_arguments {
        assert!(out.len() <= 1);
    }
});
