use std::sync::Arc;

use bouncer_chat::{ChatChannel, ChatId};
use bouncer_classifier::ClassifierTables;
use bouncer_compliance::ComplianceTable;
use bouncer_exec::RoleAssumer;
use bouncer_risk::RiskRules;
use bouncer_store::Store;
use bouncer_trust::TrustExclusionTables;

/// Rate-limit settings evaluated at pipeline step 7 (spec §4.4, §4.8).
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Sliding-window width in seconds (spec §4.4 "e.g. 60s").
    pub window_secs: i64,
    /// Max requests per `source` within the window.
    pub max_per_window: u64,
    /// Max simultaneously `pending_approval` requests per `source`.
    pub max_pending: u64,
    /// Resolves the "rate-limit fail-open" open question (spec §9): when
    /// the rate-limit store queries themselves fail, `false` lets the
    /// request proceed (the documented default); `true` treats the query
    /// failure as `rate_limit_exceeded`.
    pub fail_closed: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: 60,
            max_per_window: 20,
            max_pending: 10,
            fail_closed: false,
        }
    }
}

/// Everything the execution pipeline and callback handler need to evaluate
/// one request (spec §4.8, §4.10, §6). Cheap to clone: every table is
/// behind an `Arc`, so a `PipelineContext` can be held by the long-lived
/// chat poller as well as passed to one-off tool-surface calls.
#[derive(Clone)]
pub struct PipelineContext {
    /// State store handle.
    pub store: Arc<Store>,
    /// Outbound/inbound chat channel.
    pub chat: Arc<ChatChannel>,
    /// The chat room approval prompts are posted into.
    pub chat_id: ChatId,
    /// Command classifier tables (C1).
    pub classifier: Arc<ClassifierTables>,
    /// Compiled compliance rules (C2).
    pub compliance: Arc<ComplianceTable>,
    /// Risk-scorer weighting tables (C3).
    pub risk_rules: Arc<RiskRules>,
    /// Trust-exclusion tables (C6).
    pub exclusion: Arc<TrustExclusionTables>,
    /// Chat user ids authorized to approve/deny (spec §4.10 precondition).
    pub approvers: Arc<Vec<i64>>,
    /// Rate-limit settings (step 7).
    pub rate_limit: RateLimitConfig,
    /// Whether trust-session auto-approve is enabled at all (step 8).
    pub trust_enabled: bool,
    /// Approval window before a pending request times out (spec §4.8).
    pub approval_timeout_secs: i64,
    /// Extra retention past `expires_at` before a row is reaped.
    pub ttl_buffer_secs: i64,
    /// Assumes the target account's role, if any (spec §4.9).
    pub role_assumer: Option<Arc<dyn RoleAssumer>>,
}

impl PipelineContext {
    /// True if `approver_id` is in the configured approver set (spec §4.10
    /// precondition "the approver is authorized").
    #[must_use]
    pub fn is_authorized_approver(&self, approver_id: i64) -> bool {
        self.approvers.contains(&approver_id)
    }
}
