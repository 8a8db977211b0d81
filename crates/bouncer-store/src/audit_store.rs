use bouncer_core::AuditLogEntry;
use serde::Deserialize;

use crate::db::Database;
use crate::error::StoreResult;

const TABLE: &str = "audit_log";

/// Append-only audit trail (spec §3, §4.11).
pub struct AuditStore<'a> {
    db: &'a Database,
}

impl<'a> AuditStore<'a> {
    pub(crate) fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Append an entry. Audit rows are never updated or deleted by request
    /// flows — only the TTL reaper removes them.
    pub async fn append(&self, entry: &AuditLogEntry) -> StoreResult<()> {
        let _: Option<AuditLogEntry> = self.db.client().create(TABLE).content(entry.clone()).await?;
        Ok(())
    }

    /// List entries for a request, oldest first.
    pub async fn list_for_request(&self, request_id: &str) -> StoreResult<Vec<AuditLogEntry>> {
        let mut response = self
            .db
            .client()
            .query("SELECT * FROM type::table($table) WHERE request_id = $request_id ORDER BY created_at ASC")
            .bind(("table", TABLE))
            .bind(("request_id", request_id.to_owned()))
            .await?;
        let rows: Vec<AuditLogEntry> = response.take(0)?;
        Ok(rows)
    }

    /// Most recent `limit` entries across all requests, newest first — the
    /// `history` tool surface (spec §6).
    pub async fn recent(&self, limit: u32) -> StoreResult<Vec<AuditLogEntry>> {
        let mut response = self
            .db
            .client()
            .query("SELECT * FROM type::table($table) ORDER BY created_at DESC LIMIT $limit")
            .bind(("table", TABLE))
            .bind(("limit", limit))
            .await?;
        let rows: Vec<AuditLogEntry> = response.take(0)?;
        Ok(rows)
    }

    /// Delete rows older than `cutoff` (spec §5 TTL sweep).
    pub async fn reap_older_than(&self, cutoff: bouncer_core::Timestamp) -> StoreResult<u64> {
        #[derive(Deserialize)]
        struct Deleted {
            #[allow(dead_code)]
            request_id: String,
        }
        let mut response = self
            .db
            .client()
            .query("DELETE type::table($table) WHERE created_at < $cutoff RETURN BEFORE")
            .bind(("table", TABLE))
            .bind(("cutoff", cutoff))
            .await?;
        let deleted: Vec<Deleted> = response.take(0)?;
        Ok(deleted.len() as u64)
    }
}
