use bouncer_core::{GrantSession, GrantStatus, Timestamp};
use serde::Deserialize;

use crate::db::Database;
use crate::error::{StoreError, StoreResult};

const TABLE: &str = "grant_session";

/// Row-level operations over `GrantSession` (spec §3, §4.7).
pub struct GrantStore<'a> {
    db: &'a Database,
}

impl<'a> GrantStore<'a> {
    pub(crate) fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Insert a new grant row in `pending_approval`.
    pub async fn put(&self, grant: &GrantSession) -> StoreResult<()> {
        let key = grant.grant_id.0.clone();
        let _: Option<GrantSession> = self.db.client().create((TABLE, key.as_str())).content(grant.clone()).await?;
        Ok(())
    }

    /// Fetch a grant by id.
    pub async fn get(&self, grant_id: &str) -> StoreResult<Option<GrantSession>> {
        let row: Option<GrantSession> = self.db.client().select((TABLE, grant_id)).await?;
        Ok(row)
    }

    /// Approve a pending grant: set `status = active`, `approval_mode`,
    /// `granted_commands` and `expires_at`. Conditional on still being
    /// `pending_approval`.
    pub async fn approve(&self, grant_id: &str, next: &GrantSession) -> StoreResult<bool> {
        #[derive(Deserialize)]
        struct Updated {
            #[allow(dead_code)]
            grant_id: String,
        }
        let mut response = self
            .db
            .client()
            .query("UPDATE type::thing($table, $id) SET status = $status, approval_mode = $approval_mode, granted_commands = $granted_commands, expires_at = $expires_at WHERE status = 'pending_approval' RETURN AFTER")
            .bind(("table", TABLE))
            .bind(("id", grant_id.to_owned()))
            .bind(("status", next.status))
            .bind(("approval_mode", next.approval_mode))
            .bind(("granted_commands", next.granted_commands.clone()))
            .bind(("expires_at", next.expires_at))
            .await?;
        let updated: Vec<Updated> = response.take(0)?;
        Ok(!updated.is_empty())
    }

    /// Deny a pending grant. Conditional on still being `pending_approval`.
    pub async fn deny(&self, grant_id: &str) -> StoreResult<bool> {
        #[derive(Deserialize)]
        struct Updated {
            #[allow(dead_code)]
            grant_id: String,
        }
        let mut response = self
            .db
            .client()
            .query("UPDATE type::thing($table, $id) SET status = 'denied' WHERE status = 'pending_approval' RETURN AFTER")
            .bind(("table", TABLE))
            .bind(("id", grant_id.to_owned()))
            .await?;
        let updated: Vec<Updated> = response.take(0)?;
        Ok(!updated.is_empty())
    }

    /// Revoke an active grant outright.
    pub async fn revoke(&self, grant_id: &str) -> StoreResult<bool> {
        #[derive(Deserialize)]
        struct Updated {
            #[allow(dead_code)]
            grant_id: String,
        }
        let mut response = self
            .db
            .client()
            .query("UPDATE type::thing($table, $id) SET status = 'revoked' WHERE status = 'active' RETURN AFTER")
            .bind(("table", TABLE))
            .bind(("id", grant_id.to_owned()))
            .await?;
        let updated: Vec<Updated> = response.take(0)?;
        Ok(!updated.is_empty())
    }

    /// Atomically consume one use of `normalized_command` against an active,
    /// unexpired grant (spec §4.4 Testable Property 4: grant single-use).
    ///
    /// Fails the `WHERE` clause (and returns `Err(StoreError::Conflict)`) if
    /// any of: the grant isn't `active`, it has expired, the command isn't
    /// in `granted_commands`, `total_executions` is already at its ceiling,
    /// or (when `allow_repeat` is false) the command's own counter is
    /// already at 1.
    #[allow(clippy::arithmetic_side_effects)] // guarded above: total_executions < max_total_executions checked first
    pub async fn try_use_grant_command(&self, grant_id: &str, normalized_command: &str, now: Timestamp) -> StoreResult<GrantSession> {
        #[derive(Deserialize)]
        struct Updated {
            grant_id: String,
        }

        let current = self
            .get(grant_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(grant_id.to_owned()))?;

        if current.status != GrantStatus::Active {
            return Err(StoreError::Conflict(format!("grant {grant_id} is not active")));
        }
        let Some(expires_at) = current.expires_at else {
            return Err(StoreError::Conflict(format!("grant {grant_id} has no expiry set")));
        };
        if expires_at < now {
            return Err(StoreError::Conflict(format!("grant {grant_id} has expired")));
        }
        if !current.granted_commands.iter().any(|c| c == normalized_command) {
            return Err(StoreError::Conflict(format!("command not granted under {grant_id}")));
        }
        if current.total_executions >= current.max_total_executions {
            return Err(StoreError::Conflict(format!("grant {grant_id} execution ceiling reached")));
        }
        let prior_uses = current.used_commands.get(normalized_command).copied().unwrap_or(0);
        if !current.allow_repeat && prior_uses >= 1 {
            return Err(StoreError::Conflict(format!("command already used under {grant_id}")));
        }

        // Compare-and-swap on `total_executions`: the WHERE clause pins the
        // prior value, so two concurrent callers racing the same grant can
        // only have one succeed — the loser's row no longer matches and
        // must retry against the fresh state.
        let mut next_used = current.used_commands.clone();
        next_used.insert(normalized_command.to_owned(), prior_uses + 1);
        let next_total = current.total_executions + 1;

        let mut response = self
            .db
            .client()
            .query(
                "UPDATE type::thing($table, $id) SET total_executions = $next_total, used_commands = $next_used \
                 WHERE status = 'active' AND expires_at > $now AND total_executions = $prev_total \
                 RETURN AFTER",
            )
            .bind(("table", TABLE))
            .bind(("id", grant_id.to_owned()))
            .bind(("now", now))
            .bind(("prev_total", current.total_executions))
            .bind(("next_total", next_total))
            .bind(("next_used", next_used))
            .await?;
        let updated: Vec<Updated> = response.take(0)?;
        if updated.is_empty() {
            return Err(StoreError::Conflict(format!("grant {grant_id} usage condition no longer holds")));
        }

        self.get(&updated[0].grant_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(grant_id.to_owned()))
    }

    /// Mark every row whose `expires_at < now` and still `active` as
    /// `expired` (spec §5 reaper).
    pub async fn sweep_expirations(&self, now: Timestamp) -> StoreResult<u64> {
        #[derive(Deserialize)]
        struct Updated {
            #[allow(dead_code)]
            grant_id: String,
        }
        let mut response = self
            .db
            .client()
            .query("UPDATE type::table($table) SET status = 'expired' WHERE status = 'active' AND expires_at < $now RETURN AFTER")
            .bind(("table", TABLE))
            .bind(("now", now))
            .await?;
        let updated: Vec<Updated> = response.take(0)?;
        Ok(updated.len() as u64)
    }
}
