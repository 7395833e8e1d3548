//! Command line scrubbing.
//!
//! The [`Scrubber`] hides the value of any command line argument whose key
//! matches one of its sensitive patterns. It is built once per resolved
//! configuration; new words may be added while the owner holds it mutably,
//! after which `redact` only needs a shared borrow and can be called from
//! any number of threads.

use crate::compile::{compile_patterns, partition_words, RejectedWord, SensitivePattern};
use std::borrow::Cow;
use tracing::debug;

/// Words scrubbed out of every command line.
pub const DEFAULT_SENSITIVE_WORDS: &[&str] = &[
    "password",
    "passwd",
    "mysql_pwd",
    "access_token",
    "auth_token",
    "api_key",
    "apikey",
    "secret",
    "credentials",
    "stripetoken",
];

/// Replacement for a scrubbed value.
pub const MASK: &str = "********";

const REPLACEMENT: &str = "${key}${delimiter}********";

/// Scrubs sensitive values out of command lines.
#[derive(Debug, Clone)]
pub struct Scrubber {
    /// When false, command lines pass through untouched.
    pub enabled: bool,

    /// Keep only the executable, dropping every argument.
    pub strip_all_arguments: bool,

    patterns: Vec<SensitivePattern>,
    rejected: Vec<RejectedWord>,
}

impl Default for Scrubber {
    fn default() -> Self {
        Self::new()
    }
}

impl Scrubber {
    /// Enabled scrubber seeded with [`DEFAULT_SENSITIVE_WORDS`].
    pub fn new() -> Self {
        Self {
            enabled: true,
            strip_all_arguments: false,
            patterns: compile_patterns(DEFAULT_SENSITIVE_WORDS),
            rejected: Vec::new(),
        }
    }

    /// Scrubber with no patterns at all.
    pub fn empty() -> Self {
        Self {
            enabled: true,
            strip_all_arguments: false,
            patterns: Vec::new(),
            rejected: Vec::new(),
        }
    }

    /// Compile `words` and append them to the existing patterns.
    ///
    /// Invalid words are logged and kept in [`Scrubber::rejected`].
    pub fn add_custom_words<I, S>(&mut self, words: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let (added, rejected) = partition_words(words);
        debug!(count = added.len(), "data scrubber: adding custom sensitive words");
        self.patterns.extend(added);
        self.rejected.extend(rejected);
    }

    pub fn patterns(&self) -> &[SensitivePattern] {
        &self.patterns
    }

    /// Custom words that were not compiled, in the order they were added.
    pub fn rejected(&self) -> &[RejectedWord] {
        &self.rejected
    }

    /// Redact a tokenized command line.
    ///
    /// Returns the input slice itself (`Cow::Borrowed`) when nothing had to
    /// change, so callers can keep their original allocation.
    pub fn redact<'a>(&self, cmdline: &'a [String]) -> Cow<'a, [String]> {
        if !self.enabled {
            return Cow::Borrowed(cmdline);
        }

        if self.strip_all_arguments {
            return Cow::Borrowed(&cmdline[..cmdline.len().min(1)]);
        }

        match self.scrub_joined(&cmdline.join(" ")) {
            Some(scrubbed) => Cow::Owned(scrubbed.split(' ').map(str::to_string).collect()),
            None => Cow::Borrowed(cmdline),
        }
    }

    /// Apply every pattern in order to a space-joined command line.
    ///
    /// Returns `None` if no pattern matched.
    fn scrub_joined(&self, raw: &str) -> Option<String> {
        let mut current = Cow::Borrowed(raw);
        let mut changed = false;

        for pattern in &self.patterns {
            let replaced = match pattern.regex().replace_all(&current, REPLACEMENT) {
                Cow::Owned(replaced) => Some(replaced),
                Cow::Borrowed(_) => None,
            };
            if let Some(replaced) = replaced {
                current = Cow::Owned(replaced);
                changed = true;
            }
        }

        changed.then(|| current.into_owned())
    }
}
