//! Sensitive-argument scrubbing for the process agent.
//!
//! Checks collect full command lines from the host. Before any of them is
//! included in an outbound payload it goes through a [`Scrubber`], which
//! masks the value of every argument whose key looks like a credential.
//!
//! # Key Features
//!
//! - **Wildcard words**: sensitive words may use `*` to match a run of
//!   characters (`*password*`, `*api_key`).
//! - **Non-fatal compilation**: an invalid word is reported and skipped, the
//!   rest of the batch still compiles.
//! - **Zero-copy on clean input**: command lines without secrets are handed
//!   back as the same slice.
//!
//! # Example
//!
//! ```
//! use pa_redact::Scrubber;
//!
//! let mut scrubber = Scrubber::new();
//! scrubber.add_custom_words(["consul_token"]);
//!
//! let cmdline: Vec<String> = ["consul", "consul_token", "1234"]
//!     .iter()
//!     .map(|s| s.to_string())
//!     .collect();
//! let scrubbed = scrubber.redact(&cmdline);
//! assert_eq!(scrubbed[2], "********");
//! ```

pub mod compile;
pub mod scrubber;

pub use compile::{
    compile_patterns, compile_word, compile_words, partition_words, CompiledWord, RejectedWord,
    SensitivePattern, SkipReason,
};
pub use scrubber::{Scrubber, DEFAULT_SENSITIVE_WORDS, MASK};
