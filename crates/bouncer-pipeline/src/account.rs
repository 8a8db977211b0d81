//! `add_account`/`remove_account` submission (spec §4.7, §6): shares the
//! same pending-request automaton as [`crate::execute::submit_execute`]
//! step 10, just with `Action::AddAccount`/`Action::RemoveAccount` rows
//! instead of `Action::Execute`. Resolution happens in
//! [`crate::callback::CallbackHandler`]'s `account_approve`/`account_deny`
//! arms.

use bouncer_core::{Action, Request, RequestId, RequestStatus, Timestamp};
use tracing::warn;

use crate::audit;
use crate::config::PipelineContext;
use crate::error::PipelineResult;

/// One `add_account`/`remove_account` call.
#[derive(Debug, Clone)]
pub struct AccountActionInput {
    /// `Action::AddAccount` or `Action::RemoveAccount`; anything else is a
    /// caller bug.
    pub action: Action,
    /// Requesting agent identifier.
    pub source: String,
    /// Target account id.
    pub account_id: String,
    /// `add_account` only: the role ARN to register.
    pub role_arn: Option<String>,
    /// Caller-supplied justification.
    pub reason: String,
}

/// Create the pending request and post the approval prompt. Returns the
/// request id the caller should poll via `status`.
pub async fn submit_account_action(ctx: &PipelineContext, input: AccountActionInput) -> PipelineResult<String> {
    let now = Timestamp::now();
    let mut request = Request {
        request_id: RequestId::new(),
        source: Some(input.source),
        account_id: Some(input.account_id.into()),
        command: String::new(),
        reason: input.reason,
        context: input.role_arn,
        action: input.action,
        status: RequestStatus::PendingApproval,
        risk_score: None,
        risk_category: None,
        risk_factors: Vec::new(),
        result: None,
        exit_code: None,
        chat_message_id: None,
        approved_by: None,
        created_at: now,
        approved_at: None,
        decided_at: None,
        expires_at: now.plus_seconds(ctx.approval_timeout_secs),
        ttl: now.plus_seconds(ctx.approval_timeout_secs + ctx.ttl_buffer_secs),
    };

    ctx.store.requests().put(&request).await?;

    let label = match input.action {
        Action::RemoveAccount => "Remove account",
        _ => "Register account",
    };
    let account_id = request.account_id.as_ref().map_or("-", |id| id.0.as_str());
    let prompt = format!(
        "<b>{label}</b>\nAccount: <code>{account_id}</code>\nReason: {}",
        html_escape(&request.reason)
    );
    let keyboard = bouncer_chat::account_keyboard(&request.request_id.to_string());

    match ctx.chat.send(ctx.chat_id, &prompt, Some(keyboard)).await {
        Ok(message_id) => {
            request.chat_message_id = Some(message_id.0.to_string());
            ctx.store.requests().put_overwrite(&request).await?;
            audit::append(ctx, &request, "system", "pending_approval", serde_json::json!({})).await;
        }
        Err(error) => {
            warn!(%error, request_id = %request.request_id, "failed to send account approval prompt");
            request.status = RequestStatus::Error;
            request.decided_at = Some(Timestamp::now());
            ctx.store.requests().put_overwrite(&request).await?;
            audit::append(ctx, &request, "system", "error", serde_json::json!({"error": error.to_string()})).await;
        }
    }

    Ok(request.request_id.to_string())
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_escape_covers_the_three_reserved_characters() {
        assert_eq!(html_escape("a & b <script>"), "a &amp; b &lt;script&gt;");
    }

    #[test]
    fn html_escape_is_a_no_op_on_plain_text() {
        assert_eq!(html_escape("rotate prod key"), "rotate prod key");
    }
}
