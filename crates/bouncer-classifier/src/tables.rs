use serde::{Deserialize, Serialize};

use crate::{excise_query_value, normalize_lower};

/// Globally-dangerous flag substrings rejected unconditionally (spec §4.1
/// step 1).
const GLOBAL_DANGEROUS_FLAGS: &[&str] = &["--endpoint-url ", "--profile ", "--no-verify-ssl", "--ca-bundle "];

/// Result of `ClassifierTables::is_blocked`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedVerdict {
    /// Whether the command is blocked.
    pub blocked: bool,
    /// Human-readable reason, present iff `blocked`.
    pub reason: Option<String>,
}

impl BlockedVerdict {
    fn allow() -> Self {
        Self { blocked: false, reason: None }
    }

    fn deny(reason: impl Into<String>) -> Self {
        Self { blocked: true, reason: Some(reason.into()) }
    }
}

/// Externally configured classifier tables (spec §6: "Command-classifier
/// tables are external configuration"). Loaded once at process start by
/// `bouncer-config`; changes take effect on restart.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassifierTables {
    /// Prefixes that qualify a normalized, lower-cased command for
    /// auto-approval, absent a disqualifying override.
    pub safelist_prefixes: Vec<String>,
    /// Substrings that unconditionally block a command.
    pub blocked_patterns: Vec<String>,
    /// Substrings that mark a command dangerous (stricter approval UX),
    /// orthogonal to `blocked_patterns`.
    pub dangerous_patterns: Vec<String>,
    /// CloudFront distribution ids exempted from the invalidation override.
    pub cloudfront_whitelisted_distributions: Vec<String>,
}

impl ClassifierTables {
    /// `is_blocked(cmd) → {blocked?, reason}` (spec §4.1).
    #[must_use]
    pub fn is_blocked(&self, cmd: &str) -> BlockedVerdict {
        let lower = normalize_lower(cmd);

        for flag in GLOBAL_DANGEROUS_FLAGS {
            if lower.contains(flag) {
                return BlockedVerdict::deny(format!("disallowed flag: {}", flag.trim()));
            }
        }

        if lower.contains("file://") || lower.contains("fileb://") {
            return BlockedVerdict::deny("local-file reads are disallowed for value-bearing parameters");
        }

        // Excise --query's value before substring scanning the blocklist.
        let scan_target = excise_query_value(&lower);
        for pattern in &self.blocked_patterns {
            if scan_target.contains(pattern.as_str()) {
                return BlockedVerdict::deny(format!("matches blocked pattern: {pattern}"));
            }
        }

        BlockedVerdict::allow()
    }

    /// `is_dangerous(cmd)` (spec §4.1): substring match against a second
    /// table, orthogonal to `is_blocked`.
    #[must_use]
    pub fn is_dangerous(&self, cmd: &str) -> bool {
        let lower = normalize_lower(cmd);
        self.dangerous_patterns.iter().any(|p| lower.contains(p.as_str()))
    }

    /// `is_auto_approve(cmd)` (spec §4.1): true iff the normalized
    /// lower-cased form begins with a configured safe prefix and no
    /// disqualifying override holds.
    #[must_use]
    pub fn is_auto_approve(&self, cmd: &str) -> bool {
        let lower = normalize_lower(cmd);

        let matches_prefix = self.safelist_prefixes.iter().any(|p| lower.starts_with(p.as_str()));
        if !matches_prefix {
            return false;
        }

        if lower.contains("--with-decryption") {
            return false;
        }

        if is_cross_bucket_s3_copy(&lower) {
            return false;
        }

        if let Some(distribution) = cloudfront_invalidation_target(&lower) {
            if !self.cloudfront_whitelisted_distributions.iter().any(|d| d == distribution) {
                return false;
            }
        }

        true
    }
}

/// `aws s3 cp s3://… s3://…` — cross-bucket copy, never safelisted even
/// though `aws s3 cp` is a common safe prefix (spec §4.1, scenario C).
fn is_cross_bucket_s3_copy(lower: &str) -> bool {
    let Some(rest) = lower.strip_prefix("aws s3 cp ") else { return false };
    let args: Vec<&str> = rest.split_whitespace().collect();
    let sources: Vec<&str> = args.iter().copied().filter(|a| a.starts_with("s3://")).collect();
    sources.len() >= 2
}

/// Extract the distribution id from a CloudFront invalidation command, if
/// any.
fn cloudfront_invalidation_target(lower: &str) -> Option<&str> {
    if !lower.starts_with("aws cloudfront create-invalidation") {
        return None;
    }
    let marker = "--distribution-id";
    let pos = lower.find(marker)?;
    let after = lower[pos + marker.len()..].trim_start_matches([' ', '=']);
    after.split_whitespace().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables() -> ClassifierTables {
        ClassifierTables {
            safelist_prefixes: vec!["aws ec2 describe".into(), "aws s3 ls".into(), "aws s3 cp".into()],
            blocked_patterns: vec!["aws iam create".into()],
            dangerous_patterns: vec!["aws ec2 terminate-instances".into()],
            cloudfront_whitelisted_distributions: vec!["E123".into()],
        }
    }

    #[test]
    fn blocked_pattern_rejects() {
        let verdict = tables().is_blocked("aws iam create-user --user-name hacker");
        assert!(verdict.blocked);
        assert!(verdict.reason.unwrap().contains("aws iam create"));
    }

    #[test]
    fn file_scheme_rejected() {
        assert!(tables().is_blocked("aws lambda update-function-code --zip-file file://code.zip").blocked);
    }

    #[test]
    fn endpoint_url_flag_rejected() {
        assert!(tables().is_blocked("aws s3 ls --endpoint-url http://evil").blocked);
    }

    #[test]
    fn is_blocked_idempotent_under_normalization() {
        let t = tables();
        let cmd = "  aws   IAM Create-User --user-name x ";
        assert_eq!(t.is_blocked(cmd).blocked, t.is_blocked(&crate::normalize(cmd)).blocked);
    }

    #[test]
    fn dangerous_is_orthogonal_to_blocked() {
        let t = tables();
        assert!(t.is_dangerous("aws ec2 terminate-instances --instance-ids i-1"));
        assert!(!t.is_blocked("aws ec2 terminate-instances --instance-ids i-1").blocked);
    }

    #[test]
    fn auto_approve_safe_prefix() {
        assert!(tables().is_auto_approve("aws ec2 describe-instances"));
    }

    #[test]
    fn auto_approve_denies_cross_bucket_copy() {
        assert!(!tables().is_auto_approve("aws s3 cp s3://a/x s3://b/x"));
    }

    #[test]
    fn auto_approve_allows_same_bucket_copy() {
        assert!(tables().is_auto_approve("aws s3 cp s3://a/x s3://a/y"));
    }

    #[test]
    fn auto_approve_denies_with_decryption() {
        let mut t = tables();
        t.safelist_prefixes.push("aws ssm get-parameter".into());
        assert!(!t.is_auto_approve("aws ssm get-parameter --name /x --with-decryption"));
    }

    #[test]
    fn auto_approve_denies_non_whitelisted_cloudfront_invalidation() {
        let mut t = tables();
        t.safelist_prefixes.push("aws cloudfront create-invalidation".into());
        assert!(!t.is_auto_approve("aws cloudfront create-invalidation --distribution-id E999 --paths /*"));
        assert!(t.is_auto_approve("aws cloudfront create-invalidation --distribution-id E123 --paths /*"));
    }
}
