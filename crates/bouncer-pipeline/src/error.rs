use thiserror::Error;

/// Errors raised by pipeline orchestration itself, distinct from the
/// business outcomes ([`crate::execute::PipelineOutcome`]) a well-formed
/// request can resolve to.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The request failed basic shape validation before any row was created.
    #[error("validation failed: {0}")]
    Validation(String),
    /// A store operation failed (fail-closed: spec §7 "state-mutation store
    /// errors fail closed").
    #[error(transparent)]
    Store(#[from] bouncer_store::StoreError),
    /// Referenced request/trust/grant/account id does not exist.
    #[error("{0} not found")]
    NotFound(String),
    /// The acting approver is not in the configured approver set.
    #[error("not an authorized approver")]
    NotAuthorized,
    /// The request was no longer `pending_approval` when the callback fired.
    #[error("request {0} already handled")]
    AlreadyHandled(String),
}

/// Convenience alias.
pub type PipelineResult<T> = Result<T, PipelineError>;
