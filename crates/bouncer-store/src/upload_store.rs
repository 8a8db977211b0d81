use bouncer_core::{Timestamp, UploadBatch};
use serde::Deserialize;

use crate::db::Database;
use crate::error::StoreResult;

const TABLE: &str = "upload_batch";

/// Row-level operations over `UploadBatch` (spec §3 "Staging bucket", §6
/// `request_presigned`/`request_presigned_batch`/`confirm_upload`).
pub struct UploadStore<'a> {
    db: &'a Database,
}

impl<'a> UploadStore<'a> {
    pub(crate) fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Insert a freshly-issued batch.
    pub async fn put(&self, batch: &UploadBatch) -> StoreResult<()> {
        let key = batch.batch_id.0.clone();
        let _: Option<UploadBatch> = self.db.client().create((TABLE, key.as_str())).content(batch.clone()).await?;
        Ok(())
    }

    /// Fetch a batch by id.
    pub async fn get(&self, batch_id: &str) -> StoreResult<Option<UploadBatch>> {
        let row: Option<UploadBatch> = self.db.client().select((TABLE, batch_id)).await?;
        Ok(row)
    }

    /// Record a `confirm_upload` verification result against a batch.
    pub async fn record_confirmation(&self, batch_id: &str, verified: bool, missing: &[String], confirmed_at: Timestamp, ttl: Timestamp) -> StoreResult<()> {
        let _: Option<UploadBatch> = self
            .db
            .client()
            .update((TABLE, batch_id))
            .merge(serde_json::json!({
                "verified": verified,
                "missing": missing,
                "confirmed_at": confirmed_at,
                "ttl": ttl,
            }))
            .await?;
        Ok(())
    }

    /// Delete rows whose `ttl < now` (spec §5 TTL sweep).
    pub async fn reap_expired(&self, now: Timestamp) -> StoreResult<u64> {
        #[derive(Deserialize)]
        struct Deleted {
            #[allow(dead_code)]
            batch_id: String,
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
