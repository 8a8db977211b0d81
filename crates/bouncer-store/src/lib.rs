//! State Store (C4).
//!
//! A transactional key-value store, backed by an embedded SurrealDB
//! instance, with the secondary-index queries and atomic conditional
//! updates the pipeline, trust and grant subsystems need. Two-tier layering
//! follows `astrid-storage`'s `Database` wrapper: one connection, one
//! namespace, one database, table-per-row-kind.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod account_store;
mod audit_store;
mod db;
mod error;
mod grant_store;
mod output_store;
mod reaper;
mod request_store;
mod sequence_index;
mod trust_store;
mod upload_store;

pub use db::Database;
pub use error::{StoreError, StoreResult};
pub use reaper::run_ttl_reaper;

/// Row-level stores, composed over one [`Database`] connection.
pub struct Store {
    db: Database,
}

impl Store {
    /// Wrap an already-connected database handle.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Requests (spec §3 `Request`).
    #[must_use]
    pub fn requests(&self) -> request_store::RequestStore<'_> {
        request_store::RequestStore::new(&self.db)
    }

    /// Trust sessions (spec §3 `TrustSession`).
    #[must_use]
    pub fn trust_sessions(&self) -> trust_store::TrustStore<'_> {
        trust_store::TrustStore::new(&self.db)
    }

    /// Grant sessions (spec §3 `GrantSession`).
    #[must_use]
    pub fn grant_sessions(&self) -> grant_store::GrantStore<'_> {
        grant_store::GrantStore::new(&self.db)
    }

    /// Audit log (spec §3 `AuditLog`).
    #[must_use]
    pub fn audit_log(&self) -> audit_store::AuditStore<'_> {
        audit_store::AuditStore::new(&self.db)
    }

    /// Output pages (spec §3 `OutputPage`).
    #[must_use]
    pub fn output_pages(&self) -> output_store::OutputStore<'_> {
        output_store::OutputStore::new(&self.db)
    }

    /// Accounts (spec §3 `Account`).
    #[must_use]
    pub fn accounts(&self) -> account_store::AccountStore<'_> {
        account_store::AccountStore::new(&self.db)
    }

    /// Command-history lookup for `bouncer-risk`'s sequence analysis.
    #[must_use]
    pub fn sequence_history(&self) -> sequence_index::StoreSequenceHistory<'_> {
        sequence_index::StoreSequenceHistory::new(&self.db)
    }

    /// Presigned-upload batches (spec §3 "Staging bucket").
    #[must_use]
    pub fn upload_batches(&self) -> upload_store::UploadStore<'_> {
        upload_store::UploadStore::new(&self.db)
    }
}
