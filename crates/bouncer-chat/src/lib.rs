//! Chat Channel (C5, spec §4.5): a bidirectional messaging endpoint with
//! rich-text rendering, inline buttons, editable messages, and long-polling
//! updates.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod channel;
mod error;
mod keyboard;
mod poller;

pub use channel::{ChatChannel, SendRequest};
pub use error::{ChatError, ChatResult};
pub use keyboard::{account_keyboard, approval_keyboard, build_keyboard, grant_keyboard, revoke_keyboard, InlineButton};
pub use poller::{CallbackSink, ChatCallback, Poller};

pub use teloxide::types::{ChatId, MessageId};
pub use teloxide::Bot;
