use thiserror::Error;

/// Errors raised by the chat channel.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The underlying bot API call failed.
    #[error("chat transport error: {0}")]
    Transport(#[from] teloxide::RequestError),
    /// Callback data did not match the `action:request_id` format (spec §4.5).
    #[error("malformed callback data: {0}")]
    MalformedCallback(String),
}

/// Convenience alias.
pub type ChatResult<T> = Result<T, ChatError>;
