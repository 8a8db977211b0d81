use teloxide::prelude::*;
use teloxide::types::{BotCommand, InlineKeyboardMarkup, ParseMode};
use teloxide::Bot;

use crate::error::ChatResult;

/// One outbound message for [`ChatChannel::send_parallel`] (spec §4.5
/// "`send_parallel(req[])` (batch HTTP)").
#[derive(Debug, Clone)]
pub struct SendRequest {
    /// Destination chat.
    pub chat_id: ChatId,
    /// Message body, rendered as HTML.
    pub text: String,
    /// Inline keyboard, if any.
    pub keyboard: Option<InlineKeyboardMarkup>,
    /// Suppress the notification sound (spec "do-not-notify").
    pub silent: bool,
}

/// The Chat Channel (C5, spec §4.5): outbound rendering plus the building
/// blocks the [`crate::poller::Poller`] uses for inbound callbacks.
#[derive(Clone)]
pub struct ChatChannel {
    bot: Bot,
}

impl ChatChannel {
    /// Wrap an existing bot handle.
    #[must_use]
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    /// Access the underlying bot handle (used by the poller for `get_updates`).
    #[must_use]
    pub fn bot(&self) -> &Bot {
        &self.bot
    }

    /// Send a message, optionally with an inline keyboard.
    pub async fn send(&self, chat_id: ChatId, text: &str, keyboard: Option<InlineKeyboardMarkup>) -> ChatResult<MessageId> {
        self.send_with_notification(chat_id, text, keyboard, false).await
    }

    /// Send a message without triggering a notification (spec "do-not-notify").
    pub async fn send_silent(&self, chat_id: ChatId, text: &str, keyboard: Option<InlineKeyboardMarkup>) -> ChatResult<MessageId> {
        self.send_with_notification(chat_id, text, keyboard, true).await
    }

    async fn send_with_notification(&self, chat_id: ChatId, text: &str, keyboard: Option<InlineKeyboardMarkup>, silent: bool) -> ChatResult<MessageId> {
        let mut request = self.bot.send_message(chat_id, text).parse_mode(ParseMode::Html).disable_notification(silent);
        if let Some(keyboard) = keyboard {
            request = request.reply_markup(keyboard);
        }
        let message = request.await?;
        Ok(message.id)
    }

    /// Edit a previously sent message's text and (optionally) its keyboard.
    /// Passing `keyboard: None` clears any existing inline buttons, which is
    /// how a resolved approval prompt loses its `[Approve/Deny]` row.
    pub async fn edit(&self, chat_id: ChatId, message_id: MessageId, text: &str, keyboard: Option<InlineKeyboardMarkup>) -> ChatResult<()> {
        let request = self
            .bot
            .edit_message_text(chat_id, message_id, text)
            .parse_mode(ParseMode::Html)
            .reply_markup(keyboard.unwrap_or_else(|| InlineKeyboardMarkup::new(Vec::new())));
        request.await?;
        Ok(())
    }

    /// Answer an interactive callback, showing `text` as a toast.
    pub async fn answer(&self, callback_id: &str, text: &str) -> ChatResult<()> {
        self.bot.answer_callback_query(callback_id).text(text).await?;
        Ok(())
    }

    /// Replace the bot's command menu.
    pub async fn set_commands(&self, commands: &[(String, String)]) -> ChatResult<()> {
        let commands = commands
            .iter()
            .map(|(name, description)| BotCommand::new(name.clone(), description.clone()))
            .collect::<Vec<_>>();
        self.bot.set_my_commands(commands).await?;
        Ok(())
    }

    /// Send several messages concurrently, returning one result per request
    /// in input order.
    pub async fn send_parallel(&self, requests: Vec<SendRequest>) -> Vec<ChatResult<MessageId>> {
        let futures = requests.into_iter().map(|request| async move {
            if request.silent {
                self.send_silent(request.chat_id, &request.text, request.keyboard).await
            } else {
                self.send(request.chat_id, &request.text, request.keyboard).await
            }
        });
        futures::future::join_all(futures).await
    }
}

impl std::fmt::Debug for ChatChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatChannel").finish_non_exhaustive()
    }
}
