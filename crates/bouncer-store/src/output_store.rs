use bouncer_core::{OutputPage, Timestamp};
use serde::Deserialize;

use crate::db::Database;
use crate::error::StoreResult;

const TABLE: &str = "output_page";

/// Row-level operations over paged command output (spec §3, §4.5).
pub struct OutputStore<'a> {
    db: &'a Database,
}

impl<'a> OutputStore<'a> {
    pub(crate) fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Store a page, keyed `{request_id}:page:{n}`.
    pub async fn put_page(&self, page: &OutputPage) -> StoreResult<()> {
        let key = OutputPage::key(&page.request_id, page.page);
        let _: Option<OutputPage> = self.db.client().create((TABLE, key.as_str())).content(page.clone()).await?;
        Ok(())
    }

    /// Fetch a single page.
    pub async fn get_page(&self, request_id: &str, page: u32) -> StoreResult<Option<OutputPage>> {
        let key = OutputPage::key(request_id, page);
        let row: Option<OutputPage> = self.db.client().select((TABLE, key.as_str())).await?;
        Ok(row)
    }

    /// Delete rows whose `ttl < now` (spec §3, §5 TTL sweep).
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
