use bouncer_classifier::ClassifierTables;
use bouncer_compliance::ComplianceTable;
use bouncer_core::{GrantCommandCategory, GrantCommandDetail};
use bouncer_risk::{calculate_risk, RiskInput, RiskRules};
use bouncer_trust::{is_trust_excluded, TrustExclusionTables};

/// Risk score at/above which a command needs individual approval even
/// inside a batch grant (spec §4.7: "risk ≥ 66 or high-risk").
pub const REQUIRES_INDIVIDUAL_THRESHOLD: u8 = 66;

/// Run compliance, blocked, `is_trust_excluded` and risk-score over one
/// command, producing its precheck classification (spec §4.7 "Precheck").
#[must_use]
pub fn precheck_command(
    command: &str,
    source: &str,
    account_id: &str,
    is_default_account: bool,
    compliance: &ComplianceTable,
    classifier: &ClassifierTables,
    exclusion: &TrustExclusionTables,
    risk_rules: &RiskRules,
) -> GrantCommandDetail {
    let normalized = bouncer_classifier::normalize_lower(command);

    if let Some(violation) = compliance.check(command) {
        return GrantCommandDetail {
            command: command.to_owned(),
            normalized,
            category: GrantCommandCategory::Blocked,
            risk_score: 100,
            block_reason: Some(format!("{}: {}", violation.rule_id, violation.rule_name)),
        };
    }

    let verdict = classifier.is_blocked(command);
    if verdict.blocked {
        return GrantCommandDetail {
            command: command.to_owned(),
            normalized,
            category: GrantCommandCategory::Blocked,
            risk_score: 100,
            block_reason: verdict.reason,
        };
    }

    let risk = calculate_risk(
        &RiskInput {
            command,
            reason: "",
            source,
            account_id,
            is_default_account,
        },
        risk_rules,
    );

    let category = if risk.score >= REQUIRES_INDIVIDUAL_THRESHOLD || is_trust_excluded(command, exclusion) {
        GrantCommandCategory::RequiresIndividual
    } else {
        GrantCommandCategory::Grantable
    };

    let block_reason = matches!(category, GrantCommandCategory::RequiresIndividual).then(|| {
        if risk.score >= REQUIRES_INDIVIDUAL_THRESHOLD {
            format!("risk score {} at or above individual-approval threshold", risk.score)
        } else {
            "command touches a trust-excluded service, verb or flag".to_owned()
        }
    });

    GrantCommandDetail {
        command: command.to_owned(),
        normalized,
        category,
        risk_score: risk.score,
        block_reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bouncer_compliance::default_rules;

    fn harness() -> (ComplianceTable, ClassifierTables, TrustExclusionTables, RiskRules) {
        (
            ComplianceTable::compile(default_rules(&[])).unwrap(),
            ClassifierTables {
                blocked_patterns: vec!["aws iam create".into()],
                ..Default::default()
            },
            TrustExclusionTables::default(),
            RiskRules::default(),
        )
    }

    #[test]
    fn low_risk_command_is_grantable() {
        let (compliance, classifier, exclusion, rules) = harness();
        let detail = precheck_command("aws ec2 describe-instances", "agent-1", "111111111111", true, &compliance, &classifier, &exclusion, &rules);
        assert_eq!(detail.category, GrantCommandCategory::Grantable);
    }

    #[test]
    fn blocklisted_command_is_blocked() {
        let (compliance, classifier, exclusion, rules) = harness();
        let detail = precheck_command("aws iam create-user --user-name x", "agent-1", "111111111111", true, &compliance, &classifier, &exclusion, &rules);
        assert_eq!(detail.category, GrantCommandCategory::Blocked);
    }

    #[test]
    fn destructive_verb_requires_individual() {
        let (compliance, classifier, exclusion, rules) = harness();
        let detail = precheck_command(
            "aws ec2 terminate-instances --instance-ids i-123",
            "agent-1",
            "111111111111",
            true,
            &compliance,
            &classifier,
            &exclusion,
            &rules,
        );
        assert_eq!(detail.category, GrantCommandCategory::RequiresIndividual);
    }
}
