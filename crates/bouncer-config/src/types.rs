//! Configuration struct definitions.
//!
//! Every type here is self-contained with no dependency on other internal
//! Bouncer crates; the domain tables (`ClassifierTables`, `ComplianceRule`,
//! `RiskTables`, `TrustExclusionTables`, `RateLimitConfig`, ...) are mirrored
//! field-for-field and converted at the integration boundary (`bouncer-cli`'s
//! bridge module), the way `astrid-config` hands off to
//! `astrid-runtime::config_bridge`.

use std::collections::HashMap;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize};

/// Root configuration for the Bouncer broker.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BouncerConfig {
    /// Telegram chat-channel settings (C5).
    pub chat: ChatSection,
    /// State-store connection settings (C4).
    pub store: StoreSection,
    /// Command classifier tables (C1).
    pub classifier: ClassifierSection,
    /// Compliance rule table (C2).
    pub compliance: ComplianceSection,
    /// Risk-scorer weighting tables (C3).
    pub risk: RiskSection,
    /// Trust-session settings and exclusion tables (C6).
    pub trust: TrustSection,
    /// Grant-session defaults (C7).
    pub grant: GrantSection,
    /// Rate and pending-request limits (pipeline step 7).
    pub rate_limit: RateLimitSection,
    /// Approval-window and retention settings (pipeline step 10).
    pub approval: ApprovalSection,
    /// Tool-surface RPC server settings.
    pub server: ServerSection,
    /// Logging configuration.
    pub logging: LoggingSection,
}

/// Telegram chat-channel settings.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ChatSection {
    /// Bot API token. Prefer `BOUNCER_CHAT_BOT_TOKEN` over a committed file.
    #[serde(skip_serializing)]
    pub bot_token: Option<String>,
    /// The chat room approval prompts are posted into.
    pub chat_id: i64,
    /// Chat user ids authorized to approve/deny requests.
    pub approvers: Vec<i64>,
}

impl Default for ChatSection {
    fn default() -> Self {
        Self { bot_token: None, chat_id: 0, approvers: Vec::new() }
    }
}

impl std::fmt::Debug for ChatSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSection")
            .field("has_bot_token", &self.bot_token.is_some())
            .field("chat_id", &self.chat_id)
            .field("approvers", &self.approvers)
            .finish()
    }
}

impl Serialize for ChatSection {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ChatSection", 2)?;
        state.serialize_field("chat_id", &self.chat_id)?;
        state.serialize_field("approvers", &self.approvers)?;
        state.end()
    }
}

/// State-store connection settings (spec §3 embedded-store).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// On-disk path for the embedded SurrealKV store.
    pub path: String,
    /// Use an in-memory store instead of `path` (tests, ephemeral runs).
    pub in_memory: bool,
    /// TTL-reaper sweep interval in seconds.
    pub reaper_interval_secs: u64,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self { path: "./data/bouncer.db".to_owned(), in_memory: false, reaper_interval_secs: 60 }
    }
}

/// Command classifier tables, mirroring `bouncer_classifier::ClassifierTables`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierSection {
    /// Prefixes that qualify a command for auto-approval.
    pub safelist_prefixes: Vec<String>,
    /// Substrings that unconditionally block a command.
    pub blocked_patterns: Vec<String>,
    /// Substrings that mark a command dangerous.
    pub dangerous_patterns: Vec<String>,
    /// CloudFront distribution ids exempted from the invalidation override.
    pub cloudfront_whitelisted_distributions: Vec<String>,
}

/// Compliance rule table, mirroring `bouncer_compliance::ComplianceRule`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplianceSection {
    /// Account ids excluded from the "external trust policy" rule.
    pub trusted_account_ids: Vec<String>,
    /// Whether the illustrative default rule table (spec §4.2) is included
    /// alongside `extra_rules`.
    pub include_default_rules: bool,
    /// Additional rules layered on top of the defaults.
    pub extra_rules: Vec<ComplianceRuleSection>,
}

/// One configured compliance rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceRuleSection {
    /// Stable rule identifier.
    pub id: String,
    /// Short human name.
    pub name: String,
    /// Longer description.
    pub description: String,
    /// Suggested fix.
    pub remediation: String,
    /// Regex evaluated against the raw command text.
    pub pattern: String,
}

/// Risk-scorer weighting tables, mirroring `bouncer_risk::RiskTables`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskSection {
    /// Per-verb base score in `[0, 100]`.
    pub verb_scores: HashMap<String, f64>,
    /// Score applied when no configured verb matches.
    pub default_verb_score: f64,
    /// `(substring, weight)` pairs scanned against the argument body.
    pub risky_parameter_patterns: Vec<(String, f64)>,
    /// Services considered cross-account/sensitive.
    pub sensitive_services: Vec<String>,
    /// Score at and above which a request is auto-blocked (spec §4.3/§4.8
    /// step 9).
    pub block_threshold: u8,
}

impl Default for RiskSection {
    fn default() -> Self {
        Self {
            verb_scores: HashMap::new(),
            default_verb_score: 30.0,
            risky_parameter_patterns: Vec::new(),
            sensitive_services: Vec::new(),
            block_threshold: 85,
        }
    }
}

/// Trust-session settings, mirroring `bouncer_trust::TrustExclusionTables`
/// plus the session defaults `create_trust_session` takes as parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustSection {
    /// Whether trust-session auto-approve is enabled at all.
    pub enabled: bool,
    /// Trust window in seconds.
    pub default_duration_secs: i64,
    /// Command ceiling per trust session.
    pub default_max_commands: u32,
    /// Service names always excluded from trust auto-approve.
    pub sensitive_services: Vec<String>,
    /// Verb prefixes always excluded.
    pub high_risk_verbs: Vec<String>,
    /// Flags whose presence always excludes the command.
    pub excluded_flags: Vec<String>,
}

impl Default for TrustSection {
    fn default() -> Self {
        Self {
            enabled: true,
            default_duration_secs: 600,
            default_max_commands: 20,
            sensitive_services: Vec::new(),
            high_risk_verbs: Vec::new(),
            excluded_flags: Vec::new(),
        }
    }
}

/// Grant-session defaults (spec §4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GrantSection {
    /// Default grant lifetime in seconds when the caller doesn't specify one.
    pub default_duration_secs: i64,
    /// Default command ceiling per grant.
    pub default_max_commands: u32,
}

impl Default for GrantSection {
    fn default() -> Self {
        Self { default_duration_secs: 3600, default_max_commands: 50 }
    }
}

/// Rate and pending-request limits, mirroring
/// `bouncer_pipeline::RateLimitConfig`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSection {
    /// Sliding-window width in seconds.
    pub window_secs: i64,
    /// Max requests per source within the window.
    pub max_per_window: u64,
    /// Max simultaneously `pending_approval` requests per source.
    pub max_pending: u64,
    /// Treat a rate-limit store error as `rate_limit_exceeded` instead of
    /// letting the request through.
    pub fail_closed: bool,
}

impl Default for RateLimitSection {
    fn default() -> Self {
        Self { window_secs: 60, max_per_window: 20, max_pending: 10, fail_closed: false }
    }
}

/// Approval-window and output-retention settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApprovalSection {
    /// Seconds before a `pending_approval` request times out.
    pub timeout_secs: i64,
    /// Extra retention past `expires_at` before a row is reaped.
    pub ttl_buffer_secs: i64,
}

impl Default for ApprovalSection {
    fn default() -> Self {
        Self { timeout_secs: 300, ttl_buffer_secs: 3600 }
    }
}

/// Tool-surface RPC server settings.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Address the RPC server binds to.
    pub bind_addr: String,
    /// Shared secret agents must present in the auth header.
    #[serde(skip_serializing)]
    pub shared_secret: Option<String>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self { bind_addr: "127.0.0.1:8787".to_owned(), shared_secret: None }
    }
}

impl std::fmt::Debug for ServerSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerSection")
            .field("bind_addr", &self.bind_addr)
            .field("has_shared_secret", &self.shared_secret.is_some())
            .finish()
    }
}

impl Serialize for ServerSection {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ServerSection", 1)?;
        state.serialize_field("bind_addr", &self.bind_addr)?;
        state.end()
    }
}

/// Logging configuration (spec §1 ambient stack).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// `tracing-subscriber` env-filter directive, e.g. `"bouncer=info,warn"`.
    pub filter: String,
    /// Emit newline-delimited JSON instead of the pretty human format.
    pub json: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self { filter: "info".to_owned(), json: false }
    }
}
