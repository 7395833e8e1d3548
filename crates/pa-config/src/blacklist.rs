//! Process blacklist matching.

use regex::Regex;
use tracing::warn;

/// Compile blacklist patterns, skipping the ones that are not valid regexes.
pub fn compile_blacklist<I, S>(patterns: I) -> Vec<Regex>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    patterns
        .into_iter()
        .filter_map(|p| match Regex::new(p.as_ref()) {
            Ok(re) => Some(re),
            Err(e) => {
                warn!(pattern = p.as_ref(), error = %e, "invalid blacklist pattern, skipping");
                None
            }
        })
        .collect()
}

/// Whether the space-joined command line matches any blacklist entry.
pub fn is_blacklisted(cmdline: &[String], blacklist: &[Regex]) -> bool {
    if blacklist.is_empty() {
        return false;
    }
    let joined = cmdline.join(" ");
    blacklist.iter().any(|re| re.is_match(&joined))
}
