use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Configurable weighting and vocabulary for the risk scorer (spec §4.3).
/// Supplied by `bouncer-config`; the shape here is data, the scoring
/// algorithm that consumes it is design.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskTables {
    /// Per-verb base score in `[0, 100]`, e.g. `"delete" => 70.0`.
    pub verb_scores: HashMap<String, f64>,
    /// Score applied when no configured verb matches.
    pub default_verb_score: f64,
    /// Substrings in the argument body that each add a fixed amount to the
    /// parameter-risk dimension, e.g. wildcard ARNs, `0.0.0.0/0`.
    pub risky_parameter_patterns: Vec<(String, f64)>,
    /// Services considered cross-account/sensitive for the account
    /// dimension, e.g. `"iam"`, `"organizations"`.
    pub sensitive_services: Vec<String>,
}

impl Default for RiskTables {
    fn default() -> Self {
        let verb_scores = [
            ("describe", 5.0),
            ("list", 5.0),
            ("get", 10.0),
            ("put", 40.0),
            ("create", 45.0),
            ("update", 50.0),
            ("modify", 55.0),
            ("revoke", 55.0),
            ("authorize", 60.0),
            ("stop", 60.0),
            ("reboot", 60.0),
            ("detach", 60.0),
            ("delete", 75.0),
            ("remove", 75.0),
            ("terminate", 90.0),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v))
        .collect();

        Self {
            verb_scores,
            default_verb_score: 30.0,
            risky_parameter_patterns: vec![
                ("0.0.0.0/0".to_owned(), 25.0),
                (":root".to_owned(), 20.0),
                ("\"*\"".to_owned(), 15.0),
                ("--force".to_owned(), 10.0),
            ],
            sensitive_services: vec!["iam".into(), "organizations".into(), "sts".into(), "kms".into()],
        }
    }
}
