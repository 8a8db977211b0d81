use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

/// One inline button. Callback data is always rendered as `action:request_id`
/// (spec §4.10 "the callback data (`action:request_id`)").
#[derive(Debug, Clone)]
pub struct InlineButton {
    /// User-visible label.
    pub label: String,
    /// One of `approve`, `approve_trust`, `deny`, `revoke_trust`,
    /// `account_approve`, `account_deny`.
    pub action: String,
    /// The request (or account) this button resolves.
    pub request_id: String,
}

impl InlineButton {
    /// Build a button for `action` on `request_id`.
    #[must_use]
    pub fn new(label: impl Into<String>, action: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: action.into(),
            request_id: request_id.into(),
        }
    }

    fn callback_data(&self) -> String {
        format!("{}:{}", self.action, self.request_id)
    }
}

/// Build an inline keyboard from rows of buttons.
#[must_use]
pub fn build_keyboard(rows: &[Vec<InlineButton>]) -> InlineKeyboardMarkup {
    let rows = rows
        .iter()
        .map(|row| row.iter().map(|b| InlineKeyboardButton::callback(b.label.clone(), b.callback_data())).collect::<Vec<_>>())
        .collect::<Vec<_>>();
    InlineKeyboardMarkup::new(rows)
}

/// The standard approval keyboard for a pending request (spec §4.8 step 10):
/// `[Approve, Approve+Trust, Deny]`, with `Approve+Trust` omitted for
/// dangerous commands.
#[must_use]
pub fn approval_keyboard(request_id: &str, dangerous: bool) -> InlineKeyboardMarkup {
    let mut row = vec![InlineButton::new("Approve", "approve", request_id)];
    if !dangerous {
        row.push(InlineButton::new("Approve + Trust", "approve_trust", request_id));
    }
    row.push(InlineButton::new("Deny", "deny", request_id));
    build_keyboard(&[row])
}

/// A single "revoke" button attached to trust-session auto-execution
/// notifications (spec §4.6 "Consumption").
#[must_use]
pub fn revoke_keyboard(trust_id: &str) -> InlineKeyboardMarkup {
    build_keyboard(&[vec![InlineButton::new("Revoke trust", "revoke_trust", trust_id)]])
}

/// The account-registration keyboard (`[Approve, Deny]`) used by the
/// account-registration approval flow.
#[must_use]
pub fn account_keyboard(request_id: &str) -> InlineKeyboardMarkup {
    build_keyboard(&[vec![
        InlineButton::new("Approve", "account_approve", request_id),
        InlineButton::new("Deny", "account_deny", request_id),
    ]])
}

/// The grant-session keyboard (spec §4.7 "Approval modes"): `[Grant all,
/// Safe only, Deny]`.
#[must_use]
pub fn grant_keyboard(grant_id: &str) -> InlineKeyboardMarkup {
    build_keyboard(&[vec![
        InlineButton::new("Grant all", "grant_all", grant_id),
        InlineButton::new("Safe only", "grant_safe", grant_id),
        InlineButton::new("Deny", "grant_deny", grant_id),
    ]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approval_keyboard_omits_trust_button_for_dangerous_commands() {
        let markup = approval_keyboard("req-1", true);
        let labels: Vec<_> = markup.inline_keyboard[0]
            .iter()
            .filter_map(|b| match &b.kind {
                teloxide::types::InlineKeyboardButtonKind::CallbackData(data) => Some(data.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(labels, vec!["approve:req-1".to_owned(), "deny:req-1".to_owned()]);
    }

    #[test]
    fn approval_keyboard_includes_trust_button_for_safe_commands() {
        let markup = approval_keyboard("req-2", false);
        assert_eq!(markup.inline_keyboard[0].len(), 3);
    }
}
