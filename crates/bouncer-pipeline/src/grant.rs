//! `request_grant` submission (spec §4.7, §6): builds the pending
//! [`bouncer_core::GrantSession`] via `bouncer_grant::request_grant` and
//! posts the approver prompt; resolution happens in
//! [`crate::callback::CallbackHandler`]'s `grant_all`/`grant_safe`/
//! `grant_deny` arms.

use bouncer_core::{AccountId, GrantSession};
use tracing::warn;

use crate::config::PipelineContext;
use crate::error::PipelineResult;

/// One `request_grant` call.
#[derive(Debug, Clone)]
pub struct GrantRequestInput {
    /// Requesting agent identifier.
    pub source: String,
    /// Target account id.
    pub account_id: AccountId,
    /// Up to 20 commands to precheck (spec §3 `MAX_GRANT_COMMANDS`).
    pub commands: Vec<String>,
    /// Caller-supplied justification, surfaced on the approval prompt.
    pub reason: String,
    /// Clamped 1..=60.
    pub ttl_minutes: u32,
    /// Ceiling on total executions across granted commands.
    pub max_total_executions: u32,
    /// Whether granted commands may be reused.
    pub allow_repeat: bool,
}

/// Create the pending grant session and post the approval prompt.
pub async fn submit_grant_request(ctx: &PipelineContext, input: GrantRequestInput) -> PipelineResult<GrantSession> {
    let session = bouncer_grant::request_grant(
        &ctx.store,
        &input.source,
        &input.account_id,
        &input.commands,
        input.ttl_minutes,
        input.max_total_executions,
        input.allow_repeat,
        &ctx.compliance,
        &ctx.classifier,
        &ctx.exclusion,
        &ctx.risk_rules,
    )
    .await?;

    let grantable = session.commands_detail.iter().filter(|d| d.category == bouncer_core::GrantCommandCategory::Grantable).count();
    let individual = session.commands_detail.len().saturating_sub(grantable);
    let prompt = format!(
        "<b>Grant requested</b>\nSource: {}\nAccount: <code>{}</code>\nReason: {}\n{grantable} grantable, {individual} need individual approval",
        html_escape(&input.source),
        html_escape(&input.account_id.0),
        html_escape(&input.reason),
    );
    let keyboard = bouncer_chat::grant_keyboard(&session.grant_id.to_string());
    if let Err(error) = ctx.chat.send(ctx.chat_id, &prompt, Some(keyboard)).await {
        warn!(%error, grant_id = %session.grant_id, "failed to send grant approval prompt");
    }

    Ok(session)
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_escape_covers_the_three_reserved_characters() {
        assert_eq!(html_escape("<b>urgent</b> & risky"), "&lt;b&gt;urgent&lt;/b&gt; &amp; risky");
    }
}
