//! Wire DTOs for the agent-facing tool surface (spec §6): every tool
//! returns "a JSON envelope with `status` and action-specific fields"; these
//! are those envelopes.

use bouncer_core::{Account, AuditLogEntry, GrantSession, OutputPage, Request, TrustSession};
use serde::{Deserialize, Serialize};

/// Envelope returned by `execute` (spec §4.8, §7 error taxonomy).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteResponse {
    /// One of the §7 taxonomy strings, or `pending_approval`/`auto_approved`.
    pub status: String,
    /// The created request id; always present.
    pub request_id: String,
    /// Executor exit code, once executed.
    pub exit_code: Option<i32>,
    /// Captured output, if any.
    pub result: Option<String>,
    /// Human-readable explanation (spec §7 "full explanatory text").
    pub reason: Option<String>,
}

/// Envelope returned by `status` (a superset of the persisted `Request`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Current automaton state.
    pub status: String,
    /// Echoes the query.
    pub request_id: String,
    /// Original command text.
    pub command: String,
    /// Risk score, if scored.
    pub risk_score: Option<u8>,
    /// Risk band, if scored.
    pub risk_category: Option<String>,
    /// Executor exit code, once executed.
    pub exit_code: Option<i32>,
    /// Captured output (inline, if short enough — otherwise paged).
    pub result: Option<String>,
    /// Approver identifier, once decided.
    pub approved_by: Option<String>,
    /// Set when `result` was paged: the first page's id (spec §4.5).
    pub page_id: Option<String>,
}

impl From<Request> for StatusResponse {
    fn from(request: Request) -> Self {
        Self {
            status: request.status.to_string(),
            request_id: request.request_id.to_string(),
            command: request.command,
            risk_score: request.risk_score,
            risk_category: request.risk_category.map(|c| c.to_string()),
            exit_code: request.exit_code,
            result: request.result,
            approved_by: request.approved_by,
            page_id: None,
        }
    }
}

/// Envelope returned by `get_page` (spec §4.5 output paging).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResponse {
    /// Owning request.
    pub request_id: String,
    /// 1-based page number.
    pub page: u32,
    /// Total page count.
    pub total_pages: u32,
    /// This page's content.
    pub content: String,
}

impl From<OutputPage> for PageResponse {
    fn from(page: OutputPage) -> Self {
        Self {
            request_id: page.request_id,
            page: page.page,
            total_pages: page.total_pages,
            content: page.content,
        }
    }
}

/// One row in `list_pending`'s result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingEntry {
    /// Request id.
    pub request_id: String,
    /// Requesting agent, if known.
    pub source: Option<String>,
    /// Command text.
    pub command: String,
    /// Risk score, if scored.
    pub risk_score: Option<u8>,
    /// ISO-8601 creation time.
    pub created_at: String,
}

impl From<Request> for PendingEntry {
    fn from(request: Request) -> Self {
        Self {
            request_id: request.request_id.to_string(),
            source: request.source,
            command: request.command,
            risk_score: request.risk_score,
            created_at: request.created_at.to_string(),
        }
    }
}

/// Envelope returned by `list_safelist` (spec §6 "Returns classifier tables").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafelistResponse {
    /// Command prefixes that bypass approval entirely.
    pub safelist_prefixes: Vec<String>,
    /// Patterns that terminate a request as `blocked`.
    pub blocked_patterns: Vec<String>,
    /// Patterns that mark a command as `dangerous` (suppresses `approve_trust`).
    pub dangerous_patterns: Vec<String>,
}

/// One entry in the `help` tool's static table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelpEntry {
    /// Service or command name, e.g. `"s3"`.
    pub name: String,
    /// One-line description.
    pub description: String,
    /// Representative invocation.
    pub example: String,
    /// Related entries, by `name`.
    pub see_also: Vec<String>,
}

/// One row in `list_accounts`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountInfo {
    /// Primary key.
    pub account_id: String,
    /// Human-readable label.
    pub name: String,
    /// Assume-role target, if any.
    pub role_arn: Option<String>,
    /// Whether the account may currently be targeted.
    pub enabled: bool,
    /// Whether this is the default account.
    pub is_default: bool,
}

impl From<Account> for AccountInfo {
    fn from(account: Account) -> Self {
        Self {
            account_id: account.account_id.0,
            name: account.name,
            role_arn: account.role_arn,
            enabled: account.enabled,
            is_default: account.is_default,
        }
    }
}

/// Envelope returned by `grant_status` (spec §4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantStatusResponse {
    /// Grant id.
    pub grant_id: String,
    /// Lifecycle state.
    pub status: String,
    /// Commands actually granted (populated on approval).
    pub granted_commands: Vec<String>,
    /// Total executions across all granted commands so far.
    pub total_executions: u32,
    /// Ceiling on `total_executions`.
    pub max_total_executions: u32,
    /// Absolute expiry, set on approval.
    pub expires_at: Option<String>,
}

impl From<GrantSession> for GrantStatusResponse {
    fn from(session: GrantSession) -> Self {
        Self {
            grant_id: session.grant_id.to_string(),
            status: session.status.to_string(),
            granted_commands: session.granted_commands,
            total_executions: session.total_executions,
            max_total_executions: session.max_total_executions,
            expires_at: session.expires_at.map(|t| t.to_string()),
        }
    }
}

/// Envelope returned by `trust_status` (spec §4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustStatusResponse {
    /// Trust id.
    pub trust_id: String,
    /// Whether `expires_at` is still in the future.
    pub active: bool,
    /// Commands auto-approved under this session so far.
    pub command_count: u32,
    /// Ceiling on `command_count`.
    pub max_commands: u32,
    /// ISO-8601 expiry.
    pub expires_at: String,
}

impl From<TrustSession> for TrustStatusResponse {
    fn from(session: TrustSession) -> Self {
        Self {
            active: session.is_active(),
            trust_id: session.trust_id.to_string(),
            command_count: session.command_count,
            max_commands: session.max_commands,
            expires_at: session.expires_at.to_string(),
        }
    }
}

/// One row in `history` (spec §6 "Over AuditLog + Requests").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Request this entry documents.
    pub request_id: String,
    /// What happened, e.g. `"approved"`.
    pub action: String,
    /// `"system"` or an approver id.
    pub actor: String,
    /// ISO-8601 time the entry was written.
    pub created_at: String,
}

impl From<AuditLogEntry> for HistoryEntry {
    fn from(entry: AuditLogEntry) -> Self {
        Self {
            request_id: entry.request_id,
            action: entry.action,
            actor: entry.actor,
            created_at: entry.created_at.to_string(),
        }
    }
}

/// Envelope returned by `stats` (spec §6 "Over AuditLog + Requests").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsResponse {
    /// Audit rows examined.
    pub total_events: u64,
    /// Count per `action` value observed.
    pub by_action: std::collections::BTreeMap<String, u64>,
    /// Window size, echoed back.
    pub hours: i64,
}

/// Envelope returned by any tool that only creates a pending request and
/// leaves resolution to the chat approval round-trip: `add_account`,
/// `remove_account`, `upload`, `upload_batch` (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionResponse {
    /// Always `"pending_approval"`.
    pub status: String,
    /// The created request id; poll `status` for the outcome.
    pub request_id: String,
}

/// One issued presigned upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresignedFileResponse {
    /// Caller-supplied filename.
    pub filename: String,
    /// Staging-bucket object key.
    pub s3_key: String,
    /// The issued PUT URL.
    pub put_url: String,
}

/// Envelope returned by `request_presigned`/`request_presigned_batch`
/// (spec §6 "No approval — issues PUT URLs for staging bucket").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresignedResponse {
    /// Identifies this batch for `confirm_upload`.
    pub batch_id: String,
    /// One entry per requested file.
    pub files: Vec<PresignedFileResponse>,
    /// ISO-8601 URL expiry.
    pub expires_at: String,
}

/// Envelope returned by `confirm_upload` (spec §8 Scenario F).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmUploadResponse {
    /// Echoes the query.
    pub batch_id: String,
    /// True iff every expected `s3_key` was confirmed.
    pub verified: bool,
    /// Expected `s3_key`s the confirm call did not include.
    pub missing: Vec<String>,
}
