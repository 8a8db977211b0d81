use bouncer_core::{RiskCategory, RiskFactor};

use crate::rules::RiskTables;
use crate::{truncate_factors, RiskResult};

/// Risk-table type alias exposed at the crate root; kept as a distinct name
/// from `rules::RiskTables` so callers read `RiskRules::default()` the way
/// the spec names the concept.
pub type RiskRules = RiskTables;

/// Everything `calculate_risk` needs about one invocation (spec §4.3).
#[derive(Debug, Clone)]
pub struct RiskInput<'a> {
    /// Raw or normalized command text.
    pub command: &'a str,
    /// Caller-supplied justification.
    pub reason: &'a str,
    /// Requesting agent identifier.
    pub source: &'a str,
    /// Target account id.
    pub account_id: &'a str,
    /// Whether `account_id` is the account registered `is_default` (spec
    /// §4.3 "cross-account" factor). Callers that have already resolved an
    /// `Account` pass its `is_default` straight through; callers that only
    /// have a bare id (grant prechecking) resolve it against the account
    /// store first.
    pub is_default_account: bool,
}

struct ParsedCommand {
    service: String,
    action: String,
}

fn parse_command(cmd: &str) -> Option<ParsedCommand> {
    let mut tokens = cmd.split_whitespace();
    let first = tokens.next()?;
    if first != "aws" {
        return None;
    }
    let service = tokens.next()?.to_owned();
    let action = tokens.next()?.to_owned();
    Some(ParsedCommand { service, action })
}

fn verb_of(action: &str) -> &str {
    action.split('-').next().unwrap_or(action)
}

/// Verb dimension: base destructiveness of the action's leading verb.
fn score_verb(parsed: Option<&ParsedCommand>, tables: &RiskTables) -> (f64, RiskFactor) {
    let Some(parsed) = parsed else {
        return (
            tables.default_verb_score,
            RiskFactor {
                name: "unparsed_command".into(),
                category: "verb".into(),
                raw_score: tables.default_verb_score,
                weighted_score: tables.default_verb_score * 0.4,
                weight: 0.4,
                details: "command did not parse as `aws <service> <action>`".into(),
            },
        );
    };
    let verb = verb_of(&parsed.action);
    let raw = tables.verb_scores.get(verb).copied().unwrap_or(tables.default_verb_score);
    (
        raw,
        RiskFactor {
            name: format!("verb:{verb}"),
            category: "verb".into(),
            raw_score: raw,
            weighted_score: raw * 0.4,
            weight: 0.4,
            details: format!("action `{}` keyed on verb `{verb}`", parsed.action),
        },
    )
}

/// Parameter dimension: risky substrings in the argument body.
fn score_parameters(cmd: &str, tables: &RiskTables) -> (f64, Vec<RiskFactor>) {
    let mut total = 0.0;
    let mut factors = Vec::new();
    for (pattern, weight) in &tables.risky_parameter_patterns {
        if cmd.contains(pattern.as_str()) {
            total += weight;
            factors.push(RiskFactor {
                name: format!("parameter:{pattern}"),
                category: "parameters".into(),
                raw_score: *weight,
                weighted_score: weight * 0.3,
                weight: 0.3,
                details: format!("argument body contains `{pattern}`"),
            });
        }
    }
    (total.min(100.0), factors)
}

/// Context dimension: quality of the caller-supplied `reason`.
fn score_context(reason: &str) -> (f64, RiskFactor) {
    let trimmed = reason.trim();
    let (raw, details) = if trimmed.is_empty() {
        (80.0, "no reason supplied".to_owned())
    } else if trimmed.len() < 10 {
        (50.0, "reason is unusually short".to_owned())
    } else {
        (10.0, "reason present and descriptive".to_owned())
    };
    (
        raw,
        RiskFactor {
            name: "context:reason_quality".into(),
            category: "context".into(),
            raw_score: raw,
            weighted_score: raw * 0.2,
            weight: 0.2,
            details,
        },
    )
}

/// Account dimension: targeted service sensitivity, cross-account targeting,
/// and an unidentified requesting principal (spec §4.3 names "unknown
/// principal" and "cross-account" alongside sensitive service as
/// contributing factors of this dimension).
fn score_account(parsed: Option<&ParsedCommand>, source: &str, is_default_account: bool, tables: &RiskTables) -> (f64, Vec<RiskFactor>) {
    let mut raw = 0.0;
    let mut factors = Vec::new();

    let sensitive = parsed.is_some_and(|p| tables.sensitive_services.iter().any(|s| s == &p.service));
    let sensitive_raw = if sensitive { 80.0 } else { 10.0 };
    raw += sensitive_raw;
    factors.push(RiskFactor {
        name: "account:sensitive_service".into(),
        category: "account".into(),
        raw_score: sensitive_raw,
        weighted_score: sensitive_raw * 0.1,
        weight: 0.1,
        details: if sensitive {
            "targets a configured sensitive service".to_owned()
        } else {
            "does not target a sensitive service".to_owned()
        },
    });

    if !is_default_account {
        let cross_account_raw = 60.0;
        raw += cross_account_raw;
        factors.push(RiskFactor {
            name: "account:cross_account".into(),
            category: "account".into(),
            raw_score: cross_account_raw,
            weighted_score: cross_account_raw * 0.1,
            weight: 0.1,
            details: "targets an account other than the configured default".to_owned(),
        });
    }

    if source.trim().is_empty() {
        let unknown_principal_raw = 50.0;
        raw += unknown_principal_raw;
        factors.push(RiskFactor {
            name: "account:unknown_principal".into(),
            category: "account".into(),
            raw_score: unknown_principal_raw,
            weighted_score: unknown_principal_raw * 0.1,
            weight: 0.1,
            details: "no requesting principal supplied".to_owned(),
        });
    }

    (raw.min(100.0), factors)
}

/// `score(cmd, reason, source, account) → {score, category, factors, recommendation}`
/// (spec §4.3). Formula: `0.4*verb + 0.3*parameters + 0.2*context +
/// 0.1*account`, clamped to `[0, 100]`.
#[must_use]
pub fn calculate_risk(input: &RiskInput<'_>, tables: &RiskTables) -> RiskResult {
    let parsed = parse_command(input.command);

    let (verb_raw, verb_factor) = score_verb(parsed.as_ref(), tables);
    let (param_raw, param_factors) = score_parameters(input.command, tables);
    let (context_raw, context_factor) = score_context(input.reason);
    let (account_raw, account_factors) = score_account(parsed.as_ref(), input.source, input.is_default_account, tables);

    let total = 0.4 * verb_raw + 0.3 * param_raw + 0.2 * context_raw + 0.1 * account_raw;
    let clamped = total.clamp(0.0, 100.0);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let score = clamped.round() as u8;

    let mut factors = vec![verb_factor, context_factor];
    factors.extend(account_factors);
    factors.extend(param_factors);
    let factors = truncate_factors(factors);

    let category = RiskCategory::from_score(score);
    let recommendation = match category {
        RiskCategory::AutoApprove => "proceeds as if on the safelist".to_owned(),
        RiskCategory::Log => "auto-approved but audited with full factors".to_owned(),
        RiskCategory::Confirm => "requires approval; prompt flags it".to_owned(),
        RiskCategory::Manual => "requires approval, always".to_owned(),
        RiskCategory::Block => "auto-rejected".to_owned(),
    };

    RiskResult { score, category, factors, recommendation }
}

/// Fail-closed fallback used whenever scoring cannot complete (spec §4.3,
/// §7): category `manual`, score 70.
#[must_use]
pub fn fail_closed_fallback(reason: &str) -> RiskResult {
    RiskResult {
        score: 70,
        category: RiskCategory::Manual,
        factors: vec![RiskFactor {
            name: "evaluation_error".into(),
            category: "error".into(),
            raw_score: 70.0,
            weighted_score: 70.0,
            weight: 1.0,
            details: reason.to_owned(),
        }],
        recommendation: "scoring failed; falling back to manual review".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_is_low_risk() {
        let tables = RiskTables::default();
        let input = RiskInput { command: "aws ec2 describe-instances", reason: "routine inventory check", source: "s", account_id: "111111111111", is_default_account: true };
        let result = calculate_risk(&input, &tables);
        assert_eq!(result.category, RiskCategory::AutoApprove);
    }

    #[test]
    fn terminate_with_no_reason_is_high_risk() {
        let tables = RiskTables::default();
        let input = RiskInput { command: "aws ec2 terminate-instances --instance-ids i-1", reason: "", source: "s", account_id: "111111111111", is_default_account: true };
        let result = calculate_risk(&input, &tables);
        assert!(result.score >= 66);
    }

    #[test]
    fn iam_service_bumps_account_dimension() {
        let tables = RiskTables::default();
        let input = RiskInput { command: "aws iam create-user --user-name x", reason: "onboarding new service account for ci", source: "s", account_id: "111111111111", is_default_account: true };
        let result = calculate_risk(&input, &tables);
        assert!(result.factors.iter().any(|f| f.name == "account:sensitive_service"));
    }

    #[test]
    fn score_is_clamped_to_0_100() {
        let tables = RiskTables::default();
        let input = RiskInput { command: "aws ec2 terminate-instances 0.0.0.0/0 :root \"*\" --force", reason: "", source: "s", account_id: "111111111111", is_default_account: true };
        let result = calculate_risk(&input, &tables);
        assert!(result.score <= 100);
    }

    #[test]
    fn at_most_five_factors_retained() {
        let tables = RiskTables::default();
        let input = RiskInput { command: "aws ec2 terminate-instances 0.0.0.0/0 :root \"*\" --force", reason: "", source: "s", account_id: "111111111111", is_default_account: true };
        let result = calculate_risk(&input, &tables);
        assert!(result.factors.len() <= 5);
    }

    #[test]
    fn cross_account_targeting_raises_account_dimension() {
        let tables = RiskTables::default();
        let input = RiskInput { command: "aws ec2 describe-instances", reason: "routine inventory check", source: "s", account_id: "222222222222", is_default_account: false };
        let result = calculate_risk(&input, &tables);
        assert!(result.factors.iter().any(|f| f.name == "account:cross_account"));
    }

    #[test]
    fn empty_source_is_treated_as_unknown_principal() {
        let tables = RiskTables::default();
        let input = RiskInput { command: "aws ec2 describe-instances", reason: "routine inventory check", source: "", account_id: "111111111111", is_default_account: true };
        let result = calculate_risk(&input, &tables);
        assert!(result.factors.iter().any(|f| f.name == "account:unknown_principal"));
    }
}
