use bouncer_core::RiskCategory;

use crate::scorer::{calculate_risk, RiskInput, RiskRules};
use crate::sequence::{get_sequence_risk_modifier, SequenceHistory};
use crate::RiskResult;

/// Shadow-only decision label (spec §9: "Smart-approval is shadow-only" —
/// the verdict is recorded, never enforced, except the extreme `block`
/// category which the risk scorer already treats as terminal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalDecisionKind {
    /// Final score <= 25.
    AutoApprove,
    /// Final score 26-45: auto, but logged with full factors.
    AutoApproveLog,
    /// Final score 46-65: needs a confirmed reason.
    NeedsConfirmation,
    /// Final score 66-85: needs human approval.
    NeedsApproval,
    /// Final score >= 86 or base category `block`.
    Blocked,
}

/// Combined risk-score + sequence-analysis verdict (spec §9: recorded on
/// the Request for forensic purposes, never used to short-circuit the
/// pipeline outside of `Blocked`).
#[derive(Debug, Clone)]
pub struct ApprovalDecision {
    /// The shadow label.
    pub kind: ApprovalDecisionKind,
    /// The underlying risk-scorer output.
    pub risk_result: RiskResult,
    /// Sequence-analysis modifier applied, in `[-0.3, 0.3]`.
    pub sequence_modifier: f64,
    /// `base_score * (1 + sequence_modifier)`, clamped to `[0, 100]`.
    pub final_score: u8,
    /// Human-readable explanation.
    pub reason: String,
}

/// `evaluate_command(...)` (spec §4.3, §9): combine the base risk score
/// with the sequence-analysis modifier into the shadow label. Fail-closed:
/// any failure in the underlying scorer already returns a `manual`
/// fallback, which this function maps to `NeedsApproval`.
pub async fn evaluate_command(
    input: &RiskInput<'_>,
    tables: &RiskRules,
    history: Option<&dyn SequenceHistory>,
) -> ApprovalDecision {
    let risk_result = calculate_risk(input, tables);
    let base_score = f64::from(risk_result.score);

    let (sequence_modifier, _seq_reason) = match history {
        Some(h) => get_sequence_risk_modifier(input.source, input.command, h).await,
        None => (0.0, "sequence analysis disabled".to_owned()),
    };

    let final_score_f = (base_score * (1.0 + sequence_modifier)).clamp(0.0, 100.0);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let final_score = final_score_f.round() as u8;

    let (kind, reason) = if risk_result.category == RiskCategory::Block || final_score >= 86 {
        (ApprovalDecisionKind::Blocked, format!("risk score {final_score} >= 86, auto-rejected"))
    } else if final_score <= 25 {
        (ApprovalDecisionKind::AutoApprove, format!("risk score {final_score} <= 25, auto-approved"))
    } else if final_score <= 45 {
        (ApprovalDecisionKind::AutoApproveLog, format!("risk score {final_score}, auto-approved with full audit"))
    } else if final_score <= 65 {
        (ApprovalDecisionKind::NeedsConfirmation, format!("risk score {final_score}, needs a confirmed reason"))
    } else {
        (ApprovalDecisionKind::NeedsApproval, format!("risk score {final_score}, needs human approval"))
    };

    ApprovalDecision { kind, risk_result, sequence_modifier, final_score, reason }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn low_risk_is_auto_approve_shadow_label() {
        let tables = RiskRules::default();
        let input = RiskInput { command: "aws ec2 describe-instances", reason: "routine check of fleet health", source: "s", account_id: "111111111111", is_default_account: true };
        let decision = evaluate_command(&input, &tables, None).await;
        assert_eq!(decision.kind, ApprovalDecisionKind::AutoApprove);
    }

    #[tokio::test]
    async fn terminate_without_reason_needs_approval_or_worse() {
        let tables = RiskRules::default();
        let input = RiskInput { command: "aws ec2 terminate-instances --instance-ids i-1", reason: "", source: "s", account_id: "111111111111", is_default_account: true };
        let decision = evaluate_command(&input, &tables, None).await;
        assert!(matches!(decision.kind, ApprovalDecisionKind::NeedsApproval | ApprovalDecisionKind::Blocked));
    }
}
