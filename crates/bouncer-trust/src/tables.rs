/// Sensitive services, verbs and flags that always require fresh approval,
/// even under an active trust session (spec §4.6 "Exclusion").
#[derive(Debug, Clone)]
pub struct TrustExclusionTables {
    /// Service names (the token after `aws`) that are always excluded.
    pub sensitive_services: Vec<String>,
    /// Verb prefixes (the leading word of the action) that are always excluded.
    pub high_risk_verbs: Vec<String>,
    /// Flags whose presence always excludes the command.
    pub excluded_flags: Vec<String>,
}

impl Default for TrustExclusionTables {
    fn default() -> Self {
        Self {
            sensitive_services: vec!["iam".into(), "organizations".into(), "sts".into(), "kms".into()],
            high_risk_verbs: vec!["delete".into(), "terminate".into(), "remove".into()],
            excluded_flags: vec!["--force".into(), "--with-decryption".into()],
        }
    }
}
