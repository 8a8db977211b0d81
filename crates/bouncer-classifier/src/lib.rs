//! Command Classifier (C1).
//!
//! Normalizes and tokenizes CLI strings and answers `is_blocked` /
//! `is_dangerous` / `is_auto_approve` against externally configured tables.
//! Every predicate here is a pure function over its input and the supplied
//! table — no network or store access.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod tables;
mod tokenizer;

pub use tables::{BlockedVerdict, ClassifierTables};
pub use tokenizer::tokenize;

/// Collapse runs of whitespace to a single space and strip leading/trailing
/// space. The original string (unnormalized) is preserved for execution and
/// display; normalization exists only for comparison.
#[must_use]
pub fn normalize(cmd: &str) -> String {
    cmd.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lower-cased normalized form, used purely for substring/prefix matching.
#[must_use]
pub fn normalize_lower(cmd: &str) -> String {
    normalize(cmd).to_lowercase()
}

/// Strip the value of any `--query` argument out of a command before
/// substring scanning (spec §4.1 step 4): JMESPath expressions contain
/// back-ticks and dollar signs that would otherwise trip blocked patterns.
#[must_use]
pub fn excise_query_value(cmd: &str) -> String {
    const MARKER: &str = "--query";
    let mut out = String::with_capacity(cmd.len());
    let mut rest = cmd;
    while let Some(pos) = rest.find(MARKER) {
        out.push_str(&rest[..pos]);
        out.push_str(MARKER);
        let mut after = &rest[pos + MARKER.len()..];
        after = after.trim_start_matches([' ', '=']);
        let value_len = if let Some(quote) = after.chars().next().filter(|c| matches!(c, '"' | '\'' | '`')) {
            after[1..]
                .find(quote)
                .map_or(after.len(), |end| end + 2)
        } else {
            after.find(" --").unwrap_or(after.len())
        };
        out.push_str(" <redacted>");
        rest = &after[value_len..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_whitespace() {
        assert_eq!(normalize("  aws   ec2  describe-instances "), "aws ec2 describe-instances");
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = normalize("aws  s3   ls");
        let twice = normalize(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn excise_query_removes_jmespath_body() {
        let cmd = "aws ec2 describe-instances --query \"Reservations[].Instances[?State.Name=='running']\" --output json";
        let excised = excise_query_value(cmd);
        assert!(!excised.contains('`'));
        assert!(excised.contains("--output json"));
    }
}
