//! Risk Scorer (C3), command-sequence analysis, and the shadow-only
//! smart-approval label (spec §4.3, §9 "smart-approval is shadow-only").
//!
//! Design: fail-closed (any internal scoring error falls back to `manual`
//! at score 70), pure functions plus dependency injection for the sequence
//! lookup, decision latency dominated by string scans rather than I/O.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod rules;
mod scorer;
mod sequence;
mod smart;

pub use scorer::{calculate_risk, fail_closed_fallback, RiskInput, RiskRules};
pub use sequence::{get_sequence_risk_modifier, CommandRecord, SequenceHistory};
pub use smart::{evaluate_command, ApprovalDecision, ApprovalDecisionKind};

use bouncer_core::RiskFactor;

/// Full output of the risk scorer (spec §4.3).
#[derive(Debug, Clone)]
pub struct RiskResult {
    /// Clamped 0-100 total.
    pub score: u8,
    /// Band derived from `score`.
    pub category: bouncer_core::RiskCategory,
    /// At most five contributing factors, most significant first.
    pub factors: Vec<RiskFactor>,
    /// Human-readable recommendation text.
    pub recommendation: String,
}

const MAX_FACTORS: usize = 5;

fn truncate_factors(mut factors: Vec<RiskFactor>) -> Vec<RiskFactor> {
    factors.sort_by(|a, b| b.weighted_score.partial_cmp(&a.weighted_score).unwrap_or(std::cmp::Ordering::Equal));
    factors.truncate(MAX_FACTORS);
    factors
}

#[cfg(test)]
mod tests {
    use super::*;
    use bouncer_core::RiskCategory;

    #[test]
    fn truncate_keeps_top_five_by_weighted_score() {
        let factors: Vec<RiskFactor> = (0..8)
            .map(|i| RiskFactor {
                name: format!("f{i}"),
                category: "verb".into(),
                raw_score: f64::from(i),
                weighted_score: f64::from(i),
                weight: 1.0,
                details: String::new(),
            })
            .collect();
        let kept = truncate_factors(factors);
        assert_eq!(kept.len(), MAX_FACTORS);
        assert_eq!(kept[0].name, "f7");
    }

    #[test]
    fn fail_closed_fallback_is_manual_seventy() {
        let fallback = scorer::fail_closed_fallback("boom");
        assert_eq!(fallback.score, 70);
        assert_eq!(fallback.category, RiskCategory::Manual);
    }
}
