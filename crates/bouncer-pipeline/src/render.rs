//! Chat-card rendering (spec §4.5, §4.8 step 10, §4.10).
//!
//! Telegram only understands a handful of HTML tags (`<b>`, `<code>`), so
//! every value interpolated into a card is escaped first, the way
//! `astrid-telegram`'s formatter escapes before wrapping in markup.

use bouncer_core::Request;

const PREVIEW_LEN: usize = 300;

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_owned();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push('…');
    out
}

/// The approval prompt posted at pipeline step 10.
#[must_use]
pub fn prompt_card(request: &Request, risk_note: Option<&str>) -> String {
    let mut text = format!(
        "<b>Approval requested</b>\nCommand: <code>{}</code>\nReason: {}\nSource: {}",
        html_escape(&request.command),
        html_escape(&request.reason),
        html_escape(request.source.as_deref().unwrap_or("-")),
    );
    if let Some(note) = risk_note {
        text.push('\n');
        text.push_str(&html_escape(note));
    }
    text
}

/// The result card shown once the executor has run under an approved
/// decision (spec §4.10 transitions `approve`/`approve_trust`).
#[must_use]
pub fn result_card(request: &Request) -> String {
    let exit = request.exit_code.map_or_else(|| "-".to_owned(), |code| code.to_string());
    format!(
        "<b>{}</b>\nCommand: <code>{}</code>\nExit: {exit}\n{}",
        request.status,
        html_escape(&request.command),
        html_escape(truncate(request.result.as_deref().unwrap_or(""), PREVIEW_LEN).as_str()),
    )
}

/// The denial card shown on the `deny` transition.
#[must_use]
pub fn denial_card(request: &Request) -> String {
    format!("<b>Denied</b>\nCommand: <code>{}</code>", html_escape(&request.command))
}

/// The timeout card shown when a request's `expires_at` elapses while still
/// `pending_approval` (spec §4.8, §8 property 6).
#[must_use]
pub fn timeout_card(request: &Request) -> String {
    format!("<b>Timed out</b>\nCommand: <code>{}</code>\nNo decision within the approval window.", html_escape(&request.command))
}

/// The blocked-command card, shown silently (no approver round-trip).
#[must_use]
pub fn blocked_card(request: &Request, reason: &str) -> String {
    format!(
        "<b>Blocked</b>\nCommand: <code>{}</code>\nReason: {}",
        html_escape(&request.command),
        html_escape(reason),
    )
}

/// The silent notification posted after a trust-session auto-execution
/// (spec §4.6 "Consumption": "a silent chat notification... with a revoke
/// button").
#[must_use]
pub fn trust_auto_execute_card(request: &Request, command_count: u32, max_commands: u32) -> String {
    format!(
        "<b>Auto-executed under trust</b>\nCommand: <code>{}</code>\n{command_count}/{max_commands} commands used\n{}",
        html_escape(&request.command),
        html_escape(truncate(request.result.as_deref().unwrap_or(""), PREVIEW_LEN).as_str()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use bouncer_core::{Action, AccountId, RequestId, RequestStatus, Timestamp};

    fn sample_request() -> Request {
        let now = Timestamp::now();
        Request {
            request_id: RequestId::new(),
            source: Some("agent-1".to_owned()),
            account_id: Some(AccountId::from("111111111111")),
            command: "aws s3 ls <script>".to_owned(),
            reason: "routine check".to_owned(),
            context: None,
            action: Action::Execute,
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
            expires_at: now,
            ttl: now,
        }
    }

    #[test]
    fn prompt_card_escapes_command_html() {
        let card = prompt_card(&sample_request(), None);
        assert!(card.contains("&lt;script&gt;"));
        assert!(!card.contains("<script>"));
    }

    #[test]
    fn blocked_card_includes_reason() {
        let card = blocked_card(&sample_request(), "matched rule L1");
        assert!(card.contains("matched rule L1"));
    }
}
