use crate::tables::TrustExclusionTables;

/// `is_trust_excluded(cmd)` (spec §4.6): true iff the command touches a
/// listed sensitive service, a listed high-risk verb, or a listed flag.
#[must_use]
pub fn is_trust_excluded(cmd: &str, tables: &TrustExclusionTables) -> bool {
    let lower = cmd.to_lowercase();
    let mut tokens = lower.split_whitespace();
    let Some(first) = tokens.next() else { return false };
    if first != "aws" {
        return tables.excluded_flags.iter().any(|flag| lower.contains(flag.as_str()));
    }

    let service = tokens.next();
    if service.is_some_and(|s| tables.sensitive_services.iter().any(|svc| svc == s)) {
        return true;
    }

    let action = tokens.next();
    let verb = action.and_then(|a| a.split('-').next());
    if verb.is_some_and(|v| tables.high_risk_verbs.iter().any(|hv| hv == v)) {
        return true;
    }

    tables.excluded_flags.iter().any(|flag| lower.contains(flag.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensitive_service_is_excluded() {
        let tables = TrustExclusionTables::default();
        assert!(is_trust_excluded("aws iam create-user --user-name bob", &tables));
    }

    #[test]
    fn high_risk_verb_is_excluded() {
        let tables = TrustExclusionTables::default();
        assert!(is_trust_excluded("aws ec2 terminate-instances --instance-ids i-123", &tables));
    }

    #[test]
    fn excluded_flag_is_excluded() {
        let tables = TrustExclusionTables::default();
        assert!(is_trust_excluded("aws s3 cp foo s3://bucket --force", &tables));
    }

    #[test]
    fn plain_read_is_not_excluded() {
        let tables = TrustExclusionTables::default();
        assert!(!is_trust_excluded("aws s3 ls", &tables));
    }
}
