//! Shared audit-log append, used by both the execution pipeline and the
//! callback handler so every terminal transition leaves one row (spec §3
//! `AuditLog`, §4.11).

use bouncer_core::{Request, Timestamp};
use tracing::warn;

use crate::config::PipelineContext;

/// Append one audit row for `request`. Failures are logged and swallowed —
/// the audit trail is best-effort forensics, not part of the request
/// automaton (spec §7: audit failures never change a request's status).
pub(crate) async fn append(ctx: &PipelineContext, request: &Request, actor: &str, action: &str, details: serde_json::Value) {
    let entry = bouncer_core::AuditLogEntry {
        request_id: request.request_id.to_string(),
        action: action.to_owned(),
        actor: actor.to_owned(),
        details,
        created_at: Timestamp::now(),
    };
    if let Err(error) = ctx.store.audit_log().append(&entry).await {
        warn!(%error, request_id = %request.request_id, "failed to append audit row");
    }
}
