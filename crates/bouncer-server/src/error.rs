use jsonrpsee::types::{ErrorObject, ErrorObjectOwned};
use thiserror::Error;

/// Errors raised at the RPC boundary itself (spec §6/§7). Business
/// outcomes (`blocked`, `denied`, `timeout`, ...) are not errors — they are
/// `status` fields in a successful envelope; this enum is for requests the
/// broker cannot even evaluate.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Caller-supplied input failed shape validation.
    #[error("validation failed: {0}")]
    Validation(String),
    /// Referenced request/trust/grant/account/batch id does not exist.
    #[error("{0} not found")]
    NotFound(String),
    /// `source` on the call did not match the grant's/batch's creator.
    #[error("{0}")]
    Forbidden(String),
    /// A store operation failed (spec §7 "state-mutation store errors fail
    /// closed").
    #[error(transparent)]
    Store(#[from] bouncer_store::StoreError),
    /// Pipeline orchestration failed.
    #[error(transparent)]
    Pipeline(#[from] bouncer_pipeline::PipelineError),
}

/// Error codes on the `internal_error`/validation side of spec §7's
/// taxonomy; business outcomes never reach this conversion.
const VALIDATION_CODE: i32 = -32602; // JSON-RPC "Invalid params"
const NOT_FOUND_CODE: i32 = -32001;
const FORBIDDEN_CODE: i32 = -32002;
const INTERNAL_CODE: i32 = -32000;

impl From<ServerError> for ErrorObjectOwned {
    fn from(error: ServerError) -> Self {
        let code = match &error {
            ServerError::Validation(_) => VALIDATION_CODE,
            ServerError::NotFound(_) => NOT_FOUND_CODE,
            ServerError::Forbidden(_) => FORBIDDEN_CODE,
            ServerError::Store(_) | ServerError::Pipeline(_) => INTERNAL_CODE,
        };
        ErrorObject::owned(code, error.to_string(), None::<()>)
    }
}

/// Convenience alias.
pub type ServerResult<T> = Result<T, ServerError>;
