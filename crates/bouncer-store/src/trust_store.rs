use bouncer_core::{TrustId, TrustSession};
use serde::Deserialize;

use crate::db::Database;
use crate::error::StoreResult;

const TABLE: &str = "trust_session";

/// Row-level operations over `TrustSession` (spec §3, §4.6).
pub struct TrustStore<'a> {
    db: &'a Database,
}

impl<'a> TrustStore<'a> {
    pub(crate) fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Upsert, keyed on the deterministic `trust_id` (spec §3 invariant: at
    /// most one row per (source, account) with `expires_at > now`).
    pub async fn upsert(&self, session: &TrustSession) -> StoreResult<()> {
        let key = session.trust_id.0.clone();
        let _: Option<TrustSession> = self.db.client().update((TABLE, key.as_str())).content(session.clone()).await?;
        Ok(())
    }

    /// `get_trust(source, account)` (spec §4.6): returns the row iff one
    /// exists with `expires_at > now`.
    pub async fn get_active(&self, source: &str, account_id: &str) -> StoreResult<Option<TrustSession>> {
        let trust_id = TrustId::derive(source, account_id);
        let row: Option<TrustSession> = self.db.client().select((TABLE, trust_id.0.as_str())).await?;
        Ok(row.filter(TrustSession::is_active))
    }

    /// Direct delete of the row (spec §4.6 "Revoke").
    pub async fn revoke(&self, trust_id: &str) -> StoreResult<()> {
        let _: Option<TrustSession> = self.db.client().delete((TABLE, trust_id)).await?;
        Ok(())
    }

    /// Atomically increment `command_count`, returning the new value. Used
    /// on every silent trust auto-approve (spec §4.6 "Consumption").
    pub async fn increment_command_count(&self, trust_id: &str) -> StoreResult<u32> {
        #[derive(Deserialize)]
        struct Counted {
            command_count: u32,
        }
        let mut response = self
            .db
            .client()
            .query("UPDATE type::thing($table, $id) SET command_count += 1 RETURN AFTER")
            .bind(("table", TABLE))
            .bind(("id", trust_id.to_owned()))
            .await?;
        let rows: Vec<Counted> = response.take(0)?;
        Ok(rows.first().map_or(0, |r| r.command_count))
    }

    /// Delete every row whose `expires_at < now` (spec §3 TTL).
    pub async fn reap_expired(&self, now: bouncer_core::Timestamp) -> StoreResult<u64> {
        #[derive(Deserialize)]
        struct Deleted {
            #[allow(dead_code)]
            trust_id: String,
        }
        let mut response = self
            .db
            .client()
            .query("DELETE type::table($table) WHERE expires_at < $now RETURN BEFORE")
            .bind(("table", TABLE))
            .bind(("now", now))
            .await?;
        let deleted: Vec<Deleted> = response.take(0)?;
        Ok(deleted.len() as u64)
    }
}
