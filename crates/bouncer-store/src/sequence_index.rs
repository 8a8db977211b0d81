use async_trait::async_trait;
use bouncer_risk::{CommandRecord, SequenceHistory};

use crate::db::Database;

const TABLE: &str = "request";

/// Store-backed `SequenceHistory`, so `bouncer-risk`'s sequence analysis can
/// query recent commands without depending on storage directly (the trait
/// lives in `bouncer-risk`; this crate supplies the implementation to avoid
/// a dependency cycle).
pub struct StoreSequenceHistory<'a> {
    db: &'a Database,
}

impl<'a> StoreSequenceHistory<'a> {
    pub(crate) fn new(db: &'a Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SequenceHistory for StoreSequenceHistory<'_> {
    async fn recent_commands(&self, source: &str, lookback_minutes: i64) -> Vec<CommandRecord> {
        #[derive(serde::Deserialize)]
        struct Row {
            source: String,
            command: String,
            created_at: bouncer_core::Timestamp,
        }

        let window_start = bouncer_core::Timestamp::now().plus_seconds(-lookback_minutes * 60);
        let result = self
            .db
            .client()
            .query("SELECT source, command, created_at FROM type::table($table) WHERE source = $source AND created_at >= $window_start ORDER BY created_at DESC")
            .bind(("table", TABLE))
            .bind(("source", source.to_owned()))
            .bind(("window_start", window_start))
            .await;

        let Ok(mut response) = result else {
            // Fail-open for sequence analysis: a store error just means no
            // history is available to adjust risk, not that the command
            // should be blocked (spec §7).
            return Vec::new();
        };
        response
            .take::<Vec<Row>>(0)
            .unwrap_or_default()
            .into_iter()
            .map(|row| CommandRecord {
                source: row.source,
                command: row.command,
                recorded_at: row.created_at,
            })
            .collect()
    }
}
