use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::{AccountId, RequestId};
use crate::time::Timestamp;

/// The action an incoming Request represents (spec §3).
///
/// Exhaustive tagged union, replacing the original's dynamic dispatch on
/// action strings (spec §9): every new variant must be handled at every
/// match site, at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Run a CLI command (§4.8 entry point).
    Execute,
    /// Stage a single small-payload upload.
    Upload,
    /// Stage a multi-file batch upload.
    UploadBatch,
    /// Register a target account.
    AddAccount,
    /// Remove a target account.
    RemoveAccount,
    /// Drive the external build-and-deploy orchestrator.
    Deploy,
    /// Issue a presigned upload URL (no approval).
    PresignedUpload,
    /// Verify a staged upload against the staging bucket.
    ConfirmUpload,
    /// Create a batch grant session.
    GrantSession,
    /// Create a trust session.
    TrustSession,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Execute => "execute",
            Self::Upload => "upload",
            Self::UploadBatch => "upload_batch",
            Self::AddAccount => "add_account",
            Self::RemoveAccount => "remove_account",
            Self::Deploy => "deploy",
            Self::PresignedUpload => "presigned_upload",
            Self::ConfirmUpload => "confirm_upload",
            Self::GrantSession => "grant_session",
            Self::TrustSession => "trust_session",
        };
        write!(f, "{s}")
    }
}

/// Request status automaton (spec §3).
///
/// `pending_approval` is entered only after all pre-approval checks pass.
/// `blocked` and `auto_approved` are terminal without a chat round-trip or
/// approver, respectively. Transitions are monotonic: once terminal, no
/// further status writes occur except audit rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Awaiting an approver's decision.
    PendingApproval,
    /// Approver approved; executor ran (or will run) the command.
    Approved,
    /// Approver denied.
    Denied,
    /// Classifier or compliance rejected before any chat round-trip.
    Blocked,
    /// `expires_at` elapsed while still `pending_approval`.
    Timeout,
    /// Executor failure, or a non-approval-path internal error.
    Error,
    /// Bypassed approval via safelist, trust session, or grant consumption.
    AutoApproved,
}

impl RequestStatus {
    /// Terminal statuses never transition further (barring audit writes).
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::PendingApproval)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::PendingApproval => "pending_approval",
            Self::Approved => "approved",
            Self::Denied => "denied",
            Self::Blocked => "blocked",
            Self::Timeout => "timeout",
            Self::Error => "error",
            Self::AutoApproved => "auto_approved",
        };
        write!(f, "{s}")
    }
}

/// Error taxonomy surfaced to the agent and recorded as `decision_type`
/// (spec §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionType {
    /// Classifier or compliance rejected; carries a rule-id or pattern.
    Blocked,
    /// Flow in progress; not an error per se.
    PendingApproval,
    /// Approver denied.
    Denied,
    /// Approval window elapsed.
    Timeout,
    /// Per-source request rate exceeded.
    RateLimitExceeded,
    /// Per-source pending-request cap exceeded.
    PendingLimitExceeded,
    /// Executor failure (non-zero exit, spawn failure, timeout).
    Error,
    /// Fail-closed fallback: scorer/store transient failures that bubble up.
    InternalError,
}

impl fmt::Display for DecisionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Blocked => "blocked",
            Self::PendingApproval => "pending_approval",
            Self::Denied => "denied",
            Self::Timeout => "timeout",
            Self::RateLimitExceeded => "rate_limit_exceeded",
            Self::PendingLimitExceeded => "pending_limit_exceeded",
            Self::Error => "error",
            Self::InternalError => "internal_error",
        };
        write!(f, "{s}")
    }
}

/// Risk category band (spec §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskCategory {
    /// 0-25: proceeds as if on the safelist.
    AutoApprove,
    /// 26-45: auto but audited with full factors.
    Log,
    /// 46-65: requires approval; prompt flags it.
    Confirm,
    /// 66-85: requires approval, always.
    Manual,
    /// 86-100: pipeline treats the request as `blocked`.
    Block,
}

impl RiskCategory {
    /// Map a clamped 0-100 score to its band.
    #[must_use]
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=25 => Self::AutoApprove,
            26..=45 => Self::Log,
            46..=65 => Self::Confirm,
            66..=85 => Self::Manual,
            _ => Self::Block,
        }
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::AutoApprove => "auto_approve",
            Self::Log => "log",
            Self::Confirm => "confirm",
            Self::Manual => "manual",
            Self::Block => "block",
        };
        write!(f, "{s}")
    }
}

/// A single contributing factor to a risk score (spec §4.3); at most five
/// are retained on a `Request`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    /// Short factor name, e.g. `"destructive_verb"`.
    pub name: String,
    /// Which of the four scoring dimensions produced it.
    pub category: String,
    /// Raw (pre-weight) contribution.
    pub raw_score: f64,
    /// Weighted contribution actually added to the total.
    pub weighted_score: f64,
    /// Weight applied for this dimension.
    pub weight: f64,
    /// Free-text detail for audit/forensics.
    pub details: String,
}

/// One agent invocation and its persisted state (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Unique 12 hex-char key.
    pub request_id: RequestId,
    /// Agent identifier, if supplied.
    pub source: Option<String>,
    /// Target account, if supplied/resolved.
    pub account_id: Option<AccountId>,
    /// Raw command string, preserved verbatim for execution/display.
    pub command: String,
    /// Caller-supplied justification.
    pub reason: String,
    /// Free-form caller context.
    pub context: Option<String>,
    /// Which tool-surface action produced this row.
    pub action: Action,
    /// Current automaton state.
    pub status: RequestStatus,
    /// 0-100 risk score, if scored.
    pub risk_score: Option<u8>,
    /// Risk band, if scored.
    pub risk_category: Option<RiskCategory>,
    /// At most five contributing factors.
    pub risk_factors: Vec<RiskFactor>,
    /// Captured executor output (inline, if short enough).
    pub result: Option<String>,
    /// Executor exit code, once executed.
    pub exit_code: Option<i32>,
    /// Chat message id of the approval prompt, once sent.
    pub chat_message_id: Option<String>,
    /// Approver identifier, once decided.
    pub approved_by: Option<String>,
    /// Row creation time.
    pub created_at: Timestamp,
    /// Approval time, if approved.
    pub approved_at: Option<Timestamp>,
    /// Time any terminal decision was reached.
    pub decided_at: Option<Timestamp>,
    /// Approval-window deadline.
    pub expires_at: Timestamp,
    /// Retention deadline; rows past this are reaped.
    pub ttl: Timestamp,
}

impl Request {
    /// True if this request's approval window has elapsed and it is still
    /// `pending_approval` (spec §4.8, §8 property 6).
    #[must_use]
    pub fn is_overdue(&self) -> bool {
        self.status == RequestStatus::PendingApproval && self.expires_at.is_past()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_category_bands() {
        assert_eq!(RiskCategory::from_score(0), RiskCategory::AutoApprove);
        assert_eq!(RiskCategory::from_score(25), RiskCategory::AutoApprove);
        assert_eq!(RiskCategory::from_score(26), RiskCategory::Log);
        assert_eq!(RiskCategory::from_score(45), RiskCategory::Log);
        assert_eq!(RiskCategory::from_score(46), RiskCategory::Confirm);
        assert_eq!(RiskCategory::from_score(65), RiskCategory::Confirm);
        assert_eq!(RiskCategory::from_score(66), RiskCategory::Manual);
        assert_eq!(RiskCategory::from_score(85), RiskCategory::Manual);
        assert_eq!(RiskCategory::from_score(86), RiskCategory::Block);
        assert_eq!(RiskCategory::from_score(100), RiskCategory::Block);
    }

    #[test]
    fn terminal_statuses() {
        assert!(!RequestStatus::PendingApproval.is_terminal());
        assert!(RequestStatus::Blocked.is_terminal());
        assert!(RequestStatus::AutoApproved.is_terminal());
    }

    #[test]
    fn action_display_matches_tool_surface_names() {
        assert_eq!(Action::UploadBatch.to_string(), "upload_batch");
        assert_eq!(Action::GrantSession.to_string(), "grant_session");
    }
}
