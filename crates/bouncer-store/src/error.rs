use thiserror::Error;

/// Errors raised by the state store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No row found for the given key.
    #[error("not found: {0}")]
    NotFound(String),

    /// A conditional update's `WHERE` clause did not hold — used as the
    /// mechanism that enforces single-use grant consumption (spec §4.4) and
    /// atomic trust/grant counter increments.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The underlying database connection or query failed.
    #[error("database error: {0}")]
    Database(#[from] surrealdb::Error),

    /// A row failed to (de)serialize.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience alias.
pub type StoreResult<T> = Result<T, StoreError>;
