use std::time::Duration;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{AllowedUpdate, UpdateKind};
use tracing::{debug, warn};

use crate::channel::ChatChannel;

/// Server-side long-poll wait requested on each `getUpdates` call (spec §4.5
/// "requests updates with a 30-second server-side wait").
const POLL_TIMEOUT_SECS: u32 = 30;

/// Delay before retrying after a transport error (spec §4.5 "on any
/// transport error it sleeps 5 seconds and retries").
const ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// One resolved inline-button press (spec §4.10 input tuple, minus the
/// approver-authorization check which the pipeline performs).
#[derive(Debug, Clone)]
pub struct ChatCallback {
    /// The user who pressed the button.
    pub approver_id: i64,
    /// One of `approve`, `approve_trust`, `deny`, `revoke_trust`,
    /// `account_approve`, `account_deny`.
    pub action: String,
    /// The request (or trust/account) id the button referred to.
    pub request_id: String,
    /// Telegram's callback-query id, needed to [`ChatChannel::answer`] it.
    pub callback_id: String,
    /// The chat the originating prompt message lives in.
    pub chat_id: teloxide::types::ChatId,
    /// The originating prompt message id, if the message is still accessible.
    pub origin_message_id: Option<teloxide::types::MessageId>,
}

/// Receives each resolved callback as the [`Poller`] processes updates.
/// Implemented by the pipeline crate so `bouncer-chat` never depends on it.
#[async_trait]
pub trait CallbackSink: Send + Sync {
    /// Handle one callback. Errors are logged by the sink itself; the
    /// poller always advances its offset regardless of outcome.
    async fn handle_callback(&self, callback: ChatCallback);
}

fn parse_callback_data(data: &str) -> Option<(String, String)> {
    let (action, request_id) = data.split_once(':')?;
    if action.is_empty() || request_id.is_empty() {
        return None;
    }
    Some((action.to_owned(), request_id.to_owned()))
}

/// The single long-lived inbound poller (spec §4.5 "a single long-lived
/// Poller"). Holds the provider's update cursor in memory for the lifetime
/// of the process (spec §9 "Chat polling offset lives in memory").
pub struct Poller<H> {
    channel: ChatChannel,
    handler: H,
    offset: i32,
}

impl<H: CallbackSink> Poller<H> {
    /// Build a poller starting from the beginning of the update stream.
    #[must_use]
    pub fn new(channel: ChatChannel, handler: H) -> Self {
        Self { channel, handler, offset: 0 }
    }

    /// Run until `shutdown` fires.
    pub async fn run(mut self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    debug!("chat poller shutting down");
                    return;
                }
                outcome = self.poll_once() => {
                    if let Err(error) = outcome {
                        warn!(%error, "chat poller transport error, backing off");
                        tokio::time::sleep(ERROR_BACKOFF).await;
                    }
                }
            }
        }
    }

    async fn poll_once(&mut self) -> Result<(), teloxide::RequestError> {
        let updates = self
            .channel
            .bot()
            .get_updates()
            .offset(self.offset)
            .timeout(POLL_TIMEOUT_SECS)
            .allowed_updates([AllowedUpdate::CallbackQuery])
            .await?;

        for update in &updates {
            self.offset = self.offset.max(update.id.saturating_add(1));
            if let UpdateKind::CallbackQuery(query) = &update.kind {
                let Some(data) = query.data.as_deref() else { continue };
                let Some((action, request_id)) = parse_callback_data(data) else {
                    warn!(data, "ignoring malformed callback data");
                    continue;
                };
                let message = query.message.as_ref().and_then(|m| m.regular_message());
                let Some(chat_id) = message.map(|m| m.chat.id) else {
                    warn!("callback query with no accessible origin chat, skipping");
                    continue;
                };
                let callback = ChatCallback {
                    approver_id: query.from.id.0 as i64,
                    action,
                    request_id,
                    callback_id: query.id.clone(),
                    chat_id,
                    origin_message_id: message.map(|m| m.id),
                };
                self.handler.handle_callback(callback).await;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_action_and_request_id() {
        assert_eq!(parse_callback_data("approve:req-123"), Some(("approve".to_owned(), "req-123".to_owned())));
    }

    #[test]
    fn rejects_data_without_a_colon() {
        assert_eq!(parse_callback_data("approve"), None);
    }

    #[test]
    fn rejects_empty_action_or_request_id() {
        assert_eq!(parse_callback_data(":req-123"), None);
        assert_eq!(parse_callback_data("approve:"), None);
    }
}
