//! Sensitive word compilation.
//!
//! Turns operator-supplied sensitive words (literal words, optionally using
//! `*` wildcards) into regexes that locate a `key`, `delimiter`, `value`
//! triple inside a space-joined command line.
//!
//! Compilation is a pure step: [`compile_words`] reports, for every input
//! word, either the compiled [`SensitivePattern`] or the [`SkipReason`] it
//! was rejected for. [`compile_patterns`] is the lossy convenience wrapper
//! used by the scrubber, which logs rejections and keeps the rest.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

/// Anything outside word characters and the wildcard.
static FORBIDDEN_SYMBOLS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9_*]").expect("static regex"));

/// Why a sensitive word was not compiled.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    #[error("the sensitive word is empty")]
    Empty,

    #[error("the sensitive word must contain only alphanumeric characters, underscores or wildcards ('*')")]
    ForbiddenCharacters,

    #[error("wildcard-only ('*') sensitive words are not supported")]
    LoneWildcard,

    #[error("the sensitive word must not contain two consecutive '*'")]
    ConsecutiveWildcards,

    #[error("could not be compiled into a regex: {0}")]
    Regex(String),
}

/// A compiled matcher for one sensitive word.
///
/// The regex exposes the named groups `key`, `delimiter` and `value`.
#[derive(Debug, Clone)]
pub struct SensitivePattern {
    word: String,
    regex: Regex,
}

impl SensitivePattern {
    /// The sensitive word this pattern was compiled from.
    pub fn word(&self) -> &str {
        &self.word
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }
}

/// Result of compiling a single word, in input order.
#[derive(Debug, Clone)]
pub struct CompiledWord {
    pub word: String,
    pub outcome: Result<SensitivePattern, SkipReason>,
}

impl CompiledWord {
    pub fn is_compiled(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// A word that was left out of the pattern set, kept for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedWord {
    pub word: String,
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// Expand the wildcards of a validated word into a regex fragment.
fn expand_wildcards(word: &str) -> Result<String, SkipReason> {
    let chars: Vec<char> = word.chars().collect();
    let mut enhanced = String::with_capacity(word.len() * 2);

    for (i, &c) in chars.iter().enumerate() {
        if c != '*' {
            enhanced.push(c);
            continue;
        }
        match chars.get(i + 1) {
            // Trailing wildcard: run up to the next space or '='.
            None => enhanced.push_str("[^ =]*"),
            Some('*') => return Err(SkipReason::ConsecutiveWildcards),
            // Bounded by the next literal; it is a word character so needs no escaping.
            Some(next) => {
                enhanced.push_str("[^");
                enhanced.push(*next);
                enhanced.push_str(r"\s]*");
            }
        }
    }

    Ok(enhanced)
}

/// Compile one sensitive word.
pub fn compile_word(word: &str) -> Result<SensitivePattern, SkipReason> {
    if word.is_empty() {
        return Err(SkipReason::Empty);
    }
    if FORBIDDEN_SYMBOLS.is_match(word) {
        return Err(SkipReason::ForbiddenCharacters);
    }
    if word == "*" {
        return Err(SkipReason::LoneWildcard);
    }

    let enhanced = expand_wildcards(word)?;
    let pattern = format!(
        r"(?P<key>( +| -{{1,2}})(?i){enhanced})(?P<delimiter> +|=)(?P<value>[^\s]*)"
    );

    let regex = Regex::new(&pattern).map_err(|e| SkipReason::Regex(e.to_string()))?;
    Ok(SensitivePattern {
        word: word.to_string(),
        regex,
    })
}

/// Compile every word, keeping the per-word outcome.
pub fn compile_words<I, S>(words: I) -> Vec<CompiledWord>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    words
        .into_iter()
        .map(|w| {
            let word = w.as_ref();
            CompiledWord {
                word: word.to_string(),
                outcome: compile_word(word),
            }
        })
        .collect()
}

/// Compile every word, splitting the patterns from the rejected words.
///
/// Each rejection is logged.
pub fn partition_words<I, S>(words: I) -> (Vec<SensitivePattern>, Vec<RejectedWord>)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut patterns = Vec::new();
    let mut rejected = Vec::new();
    for compiled in compile_words(words) {
        match compiled.outcome {
            Ok(pattern) => patterns.push(pattern),
            Err(reason) => {
                warn!(word = %compiled.word, %reason, "data scrubber: sensitive word skipped");
                rejected.push(RejectedWord {
                    word: compiled.word,
                    reason,
                });
            }
        }
    }
    (patterns, rejected)
}

/// Compile every word, dropping (and logging) the ones that fail.
pub fn compile_patterns<I, S>(words: I) -> Vec<SensitivePattern>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    partition_words(words).0
}
