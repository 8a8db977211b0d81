use bouncer_core::{Request, Timestamp};
use serde::Deserialize;

use crate::db::Database;
use crate::error::StoreResult;

const TABLE: &str = "request";

/// Row-level operations over `Request` (spec §3, §4.4).
pub struct RequestStore<'a> {
    db: &'a Database,
}

impl<'a> RequestStore<'a> {
    pub(crate) fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Insert a new request row.
    pub async fn put(&self, request: &Request) -> StoreResult<()> {
        let key = request.request_id.as_hex12();
        let _: Option<Request> = self.db.client().create((TABLE, key.as_str())).content(request.clone()).await?;
        Ok(())
    }

    /// Fetch a request by id.
    pub async fn get(&self, request_id: &str) -> StoreResult<Option<Request>> {
        let row: Option<Request> = self.db.client().select((TABLE, request_id)).await?;
        Ok(row)
    }

    /// Overwrite a request row wholesale, used after the executor runs or
    /// after a callback-driven transition (spec §4.10). Callers are
    /// expected to have read-modify-written under the rule that a terminal
    /// status never regresses (spec §3 invariant).
    pub async fn put_overwrite(&self, request: &Request) -> StoreResult<()> {
        let key = request.request_id.as_hex12();
        let _: Option<Request> = self.db.client().update((TABLE, key.as_str())).content(request.clone()).await?;
        Ok(())
    }

    /// Conditionally transition `status` away from `pending_approval` only
    /// if it is still `pending_approval` (the condition the pipeline and
    /// reaper both rely on to avoid double-handling a request). Returns
    /// `Ok(false)` without side effects if the row was no longer pending.
    pub async fn try_transition_from_pending(&self, request_id: &str, next: &Request) -> StoreResult<bool> {
        #[derive(Deserialize)]
        struct Updated {
            #[allow(dead_code)]
            request_id: String,
        }

        let mut response = self
            .db
            .client()
            .query("UPDATE type::thing($table, $id) SET status = $status, result = $result, exit_code = $exit_code, approved_by = $approved_by, approved_at = $approved_at, decided_at = $decided_at, chat_message_id = $chat_message_id, risk_score = $risk_score, risk_category = $risk_category, risk_factors = $risk_factors WHERE status = 'pending_approval' RETURN AFTER")
            .bind(("table", TABLE))
            .bind(("id", request_id.to_owned()))
            .bind(("status", next.status))
            .bind(("result", next.result.clone()))
            .bind(("exit_code", next.exit_code))
            .bind(("approved_by", next.approved_by.clone()))
            .bind(("approved_at", next.approved_at))
            .bind(("decided_at", next.decided_at))
            .bind(("chat_message_id", next.chat_message_id.clone()))
            .bind(("risk_score", next.risk_score))
            .bind(("risk_category", next.risk_category))
            .bind(("risk_factors", next.risk_factors.clone()))
            .await?;
        let updated: Vec<Updated> = response.take(0)?;
        Ok(!updated.is_empty())
    }

    /// List rows with `status = pending_approval`, ordered by `created_at`
    /// descending.
    pub async fn list_pending(&self, source: Option<&str>, limit: u32) -> StoreResult<Vec<Request>> {
        let query = if source.is_some() {
            "SELECT * FROM type::table($table) WHERE status = 'pending_approval' AND source = $source ORDER BY created_at DESC LIMIT $limit"
        } else {
            "SELECT * FROM type::table($table) WHERE status = 'pending_approval' ORDER BY created_at DESC LIMIT $limit"
        };
        let mut response = self
            .db
            .client()
            .query(query)
            .bind(("table", TABLE))
            .bind(("source", source.map(str::to_owned)))
            .bind(("limit", limit))
            .await?;
        let rows: Vec<Request> = response.take(0)?;
        Ok(rows)
    }

    /// List rows for `source`, ordered by `created_at` descending — used by
    /// the rate limiter (spec §4.4, §4.8 step 7).
    pub async fn list_by_source(&self, source: &str, limit: u32) -> StoreResult<Vec<Request>> {
        let mut response = self
            .db
            .client()
            .query("SELECT * FROM type::table($table) WHERE source = $source ORDER BY created_at DESC LIMIT $limit")
            .bind(("table", TABLE))
            .bind(("source", source.to_owned()))
            .bind(("limit", limit))
            .await?;
        let rows: Vec<Request> = response.take(0)?;
        Ok(rows)
    }

    /// Count rows for `source` created at or after `window_start`, in any of
    /// `pending_approval`/`approved`/`denied` — the rate-limit window query
    /// (spec §4.4).
    pub async fn count_in_window(&self, source: &str, window_start: Timestamp) -> StoreResult<u64> {
        #[derive(Deserialize)]
        struct Count {
            count: u64,
        }
        let mut response = self
            .db
            .client()
            .query("SELECT count() AS count FROM type::table($table) WHERE source = $source AND created_at >= $window_start AND status IN ['pending_approval', 'approved', 'denied'] GROUP ALL")
            .bind(("table", TABLE))
            .bind(("source", source.to_owned()))
            .bind(("window_start", window_start))
            .await?;
        let rows: Vec<Count> = response.take(0)?;
        Ok(rows.first().map_or(0, |c| c.count))
    }

    /// Count rows for `source` still `pending_approval` — the pending-limit
    /// query (spec §4.4, §4.8 step 7).
    pub async fn count_pending(&self, source: &str) -> StoreResult<u64> {
        #[derive(Deserialize)]
        struct Count {
            count: u64,
        }
        let mut response = self
            .db
            .client()
            .query("SELECT count() AS count FROM type::table($table) WHERE source = $source AND status = 'pending_approval' GROUP ALL")
            .bind(("table", TABLE))
            .bind(("source", source.to_owned()))
            .await?;
        let rows: Vec<Count> = response.take(0)?;
        Ok(rows.first().map_or(0, |c| c.count))
    }

    /// Background reaper step (spec §4.4, §5): mark every row whose
    /// `expires_at < now` and still `pending_approval` as `timeout`.
    pub async fn sweep_timeouts(&self, now: Timestamp) -> StoreResult<u64> {
        #[derive(Deserialize)]
        struct Updated {
            #[allow(dead_code)]
            request_id: String,
        }
        let mut response = self
            .db
            .client()
            .query("UPDATE type::table($table) SET status = 'timeout', decided_at = $now WHERE status = 'pending_approval' AND expires_at < $now RETURN AFTER")
            .bind(("table", TABLE))
            .bind(("now", now))
            .await?;
        let updated: Vec<Updated> = response.take(0)?;
        Ok(updated.len() as u64)
    }

    /// Delete rows whose `ttl < now` (spec §3, §4.4 TTL sweep).
    pub async fn reap_expired(&self, now: Timestamp) -> StoreResult<u64> {
        #[derive(Deserialize)]
        struct Deleted {
            #[allow(dead_code)]
            request_id: String,
        }
        let mut response = self
            .db
            .client()
            .query("DELETE type::table($table) WHERE ttl < $now RETURN BEFORE")
            .bind(("table", TABLE))
            .bind(("now", now))
            .await?;
        let deleted: Vec<Deleted> = response.take(0)?;
        Ok(deleted.len() as u64)
    }
}
