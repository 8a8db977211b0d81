use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::{AccountId, BatchId, GrantId, TrustId};
use crate::time::Timestamp;

/// "Trust this source/account pair for N minutes or M commands" (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustSession {
    /// `deterministic_hash(trust_scope, account)`.
    pub trust_id: TrustId,
    /// Equals the `trust_scope` the session was created under.
    pub source: String,
    /// Target account this trust applies to.
    pub account_id: AccountId,
    /// Approver who created or last refreshed the session.
    pub approved_by: String,
    /// Creation time.
    pub created_at: Timestamp,
    /// Expiry; the session is inactive once past.
    pub expires_at: Timestamp,
    /// Number of commands silently auto-approved under this session so far.
    pub command_count: u32,
    /// Ceiling on `command_count`.
    pub max_commands: u32,
    /// Number of uploads silently approved under this session so far.
    pub upload_count: u32,
    /// Total bytes uploaded under this session so far.
    pub upload_bytes_total: u64,
    /// Ceiling on `upload_count`.
    pub max_uploads: u32,
}

impl TrustSession {
    /// Invariant (spec §3): at most one row per (source, account) with
    /// `expires_at > now` — callers must upsert keyed on `trust_id`.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.expires_at.is_past()
    }
}

/// Per-command precheck classification inside a `GrantSession` (spec §3,
/// §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantCommandCategory {
    /// Risk score below the individual-approval threshold.
    Grantable,
    /// High risk or trust-excluded; needs individual approval even inside a
    /// batch grant.
    RequiresIndividual,
    /// Compliance- or blocklist-rejected; never granted.
    Blocked,
}

/// One command's precheck result within a grant request (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantCommandDetail {
    /// Original command text.
    pub command: String,
    /// Normalized form used for matching.
    pub normalized: String,
    /// Precheck classification.
    pub category: GrantCommandCategory,
    /// Risk score computed during precheck.
    pub risk_score: u8,
    /// Human-readable reason, set for `requires_individual`/`blocked`.
    pub block_reason: Option<String>,
}

/// Approval mode for a grant session (spec §3, §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantApprovalMode {
    /// Grant every `grantable` and `requires_individual` command.
    All,
    /// Grant only `grantable` commands.
    SafeOnly,
}

/// Grant session lifecycle status (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantStatus {
    /// Awaiting approver decision.
    PendingApproval,
    /// Approved and consumable.
    Active,
    /// Approver denied.
    Denied,
    /// Explicitly revoked.
    Revoked,
    /// TTL elapsed.
    Expired,
}

impl fmt::Display for GrantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::PendingApproval => "pending_approval",
            Self::Active => "active",
            Self::Denied => "denied",
            Self::Revoked => "revoked",
            Self::Expired => "expired",
        };
        write!(f, "{s}")
    }
}

/// A pre-approved batch of up to 20 commands (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantSession {
    /// Random 32-hex identifier.
    pub grant_id: GrantId,
    /// Requesting agent identifier.
    pub source: String,
    /// Target account.
    pub account_id: AccountId,
    /// Precheck detail for every submitted command.
    pub commands_detail: Vec<GrantCommandDetail>,
    /// Normalized commands actually granted (populated on approval).
    pub granted_commands: Vec<String>,
    /// Per-normalized-command usage counters.
    pub used_commands: HashMap<String, u32>,
    /// Total executions across all granted commands.
    pub total_executions: u32,
    /// Ceiling on `total_executions`.
    pub max_total_executions: u32,
    /// Whether granted commands may be used more than once.
    pub allow_repeat: bool,
    /// Lifecycle state.
    pub status: GrantStatus,
    /// Which commands were granted on approval.
    pub approval_mode: Option<GrantApprovalMode>,
    /// TTL in minutes, as requested (clamped 1..=60).
    pub ttl_minutes: u32,
    /// Absolute expiry, set on approval.
    pub expires_at: Option<Timestamp>,
}

/// Append-only audit row (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    /// The request this entry documents.
    pub request_id: String,
    /// What happened, e.g. `"blocked"`, `"approved"`, `"trust_created"`.
    pub action: String,
    /// `"system"` or an approver id.
    pub actor: String,
    /// Salient fields, serialized as a JSON blob.
    pub details: serde_json::Value,
    /// When the entry was written.
    pub created_at: Timestamp,
}

/// One page of a large captured result (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputPage {
    /// Owning request.
    pub request_id: String,
    /// 1-based page number.
    pub page: u32,
    /// Total page count for this request's output.
    pub total_pages: u32,
    /// This page's content.
    pub content: String,
    /// Retention deadline.
    pub ttl: Timestamp,
}

impl OutputPage {
    /// `{request_id}:page:{n}` store key (spec §3).
    #[must_use]
    pub fn key(request_id: &str, page: u32) -> String {
        format!("{request_id}:page:{page}")
    }
}

/// Target-account configuration (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Primary key.
    pub account_id: AccountId,
    /// Human-readable label.
    pub name: String,
    /// Assume-role target; `None` for the default account.
    pub role_arn: Option<String>,
    /// Whether the account may currently be targeted.
    pub enabled: bool,
    /// Whether this is the account used when none is specified.
    pub is_default: bool,
    /// Registration time.
    pub created_at: Timestamp,
}

/// One file within a presigned-upload batch (spec §6 `request_presigned` /
/// `request_presigned_batch`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresignedFile {
    /// Caller-supplied filename.
    pub filename: String,
    /// Staging-bucket object key the presigned URL was issued for.
    pub s3_key: String,
    /// `Content-Type` the presigned URL was signed against.
    pub content_type: String,
    /// The issued PUT URL.
    pub put_url: String,
}

/// A batch of presigned uploads and, once `confirm_upload` runs, its
/// verification result (spec §3 "Staging bucket", §6 `confirm_upload`,
/// Scenario F).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadBatch {
    /// Primary key.
    pub batch_id: BatchId,
    /// Requesting agent identifier.
    pub source: String,
    /// Target account, if supplied.
    pub account_id: Option<AccountId>,
    /// Caller-supplied justification.
    pub reason: String,
    /// Every file this batch issued a presigned URL for.
    pub files: Vec<PresignedFile>,
    /// When the presigned URLs were issued.
    pub created_at: Timestamp,
    /// When the presigned URLs themselves expire (spec §6 `expires_in`).
    pub expires_at: Timestamp,
    /// Set once `confirm_upload` has run.
    pub verified: Option<bool>,
    /// `s3_key`s from `files` the confirm call did not include.
    pub missing: Vec<String>,
    /// When `confirm_upload` ran, if it has.
    pub confirmed_at: Option<Timestamp>,
    /// Retention deadline; extended to roughly a week past confirmation
    /// (spec §6 Scenario F: "a Confirm-record row written with ttl ≈ now +
    /// 7 days").
    pub ttl: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_page_key_format() {
        assert_eq!(OutputPage::key("abc123", 2), "abc123:page:2");
    }

    #[test]
    fn trust_session_active_iff_not_past() {
        let mut session = TrustSession {
            trust_id: TrustId::derive("s", "111111111111"),
            source: "s".into(),
            account_id: AccountId::from("111111111111"),
            approved_by: "alice".into(),
            created_at: Timestamp::now(),
            expires_at: Timestamp::now().plus_seconds(60),
            command_count: 0,
            max_commands: 20,
            upload_count: 0,
            upload_bytes_total: 0,
            max_uploads: 5,
        };
        assert!(session.is_active());
        session.expires_at = Timestamp::now().plus_seconds(-1);
        assert!(!session.is_active());
    }
}
