//! Bridge from [`bouncer_config::BouncerConfig`] to domain types.
//!
//! `bouncer-config` has no dependency on any other internal crate; this
//! module is the one place the config DTOs are converted into the live
//! tables `bouncer-classifier`, `bouncer-compliance`, `bouncer-risk` and
//! `bouncer-trust` actually consume, the way `astrid-runtime`'s
//! `config_bridge` is the single conversion point shared by the CLI and the
//! gateway daemon.

use bouncer_classifier::ClassifierTables;
use bouncer_compliance::{ComplianceError, ComplianceRule, ComplianceTable};
use bouncer_config::BouncerConfig;
use bouncer_pipeline::RateLimitConfig;
use bouncer_risk::RiskRules;
use bouncer_trust::TrustExclusionTables;

/// Convert config to [`ClassifierTables`].
#[must_use]
pub fn to_classifier_tables(cfg: &BouncerConfig) -> ClassifierTables {
    ClassifierTables {
        safelist_prefixes: cfg.classifier.safelist_prefixes.clone(),
        blocked_patterns: cfg.classifier.blocked_patterns.clone(),
        dangerous_patterns: cfg.classifier.dangerous_patterns.clone(),
        cloudfront_whitelisted_distributions: cfg.classifier.cloudfront_whitelisted_distributions.clone(),
    }
}

/// Convert config to a compiled [`ComplianceTable`].
///
/// # Errors
///
/// Returns an error if any configured rule's `pattern` fails to compile as
/// a regex.
pub fn to_compliance_table(cfg: &BouncerConfig) -> Result<ComplianceTable, ComplianceError> {
    let mut rules = if cfg.compliance.include_default_rules {
        bouncer_compliance::default_rules(&cfg.compliance.trusted_account_ids)
    } else {
        Vec::new()
    };
    rules.extend(cfg.compliance.extra_rules.iter().map(|rule| ComplianceRule {
        id: rule.id.clone(),
        name: rule.name.clone(),
        description: rule.description.clone(),
        remediation: rule.remediation.clone(),
        pattern: rule.pattern.clone(),
    }));
    ComplianceTable::compile(rules)
}

/// Convert config to [`RiskRules`].
#[must_use]
pub fn to_risk_rules(cfg: &BouncerConfig) -> RiskRules {
    RiskRules {
        verb_scores: cfg.risk.verb_scores.clone(),
        default_verb_score: cfg.risk.default_verb_score,
        risky_parameter_patterns: cfg.risk.risky_parameter_patterns.clone(),
        sensitive_services: cfg.risk.sensitive_services.clone(),
    }
}

/// Convert config to [`TrustExclusionTables`].
#[must_use]
pub fn to_trust_exclusion_tables(cfg: &BouncerConfig) -> TrustExclusionTables {
    TrustExclusionTables {
        sensitive_services: cfg.trust.sensitive_services.clone(),
        high_risk_verbs: cfg.trust.high_risk_verbs.clone(),
        excluded_flags: cfg.trust.excluded_flags.clone(),
    }
}

/// Convert config to [`RateLimitConfig`].
#[must_use]
pub fn to_rate_limit_config(cfg: &BouncerConfig) -> RateLimitConfig {
    RateLimitConfig {
        window_secs: cfg.rate_limit.window_secs,
        max_per_window: cfg.rate_limit.max_per_window,
        max_pending: cfg.rate_limit.max_pending,
        fail_closed: cfg.rate_limit.fail_closed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifier_tables_mirror_config_section() {
        let mut cfg = BouncerConfig::default();
        cfg.classifier.safelist_prefixes = vec!["aws s3 ls".to_owned()];
        let tables = to_classifier_tables(&cfg);
        assert_eq!(tables.safelist_prefixes, vec!["aws s3 ls".to_owned()]);
    }

    #[test]
    fn compliance_table_compiles_default_rules() {
        let mut cfg = BouncerConfig::default();
        cfg.compliance.include_default_rules = true;
        assert!(to_compliance_table(&cfg).is_ok());
    }

    #[test]
    fn compliance_table_rejects_bad_pattern() {
        let mut cfg = BouncerConfig::default();
        cfg.compliance.include_default_rules = false;
        cfg.compliance.extra_rules = vec![bouncer_config::ComplianceRuleSection {
            id: "X1".to_owned(),
            name: "bad".to_owned(),
            description: String::new(),
            remediation: String::new(),
            pattern: "(".to_owned(),
        }];
        assert!(to_compliance_table(&cfg).is_err());
    }
}
