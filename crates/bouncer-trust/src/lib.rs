//! Trust-Session Subsystem (C6, spec §4.6).
//!
//! Collapses repeated approvals within a time- and count-bounded window for
//! a single `(source, account)` pair. Exclusion rules keep a fixed set of
//! sensitive services, verbs and flags always requiring fresh approval.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod exclusion;
mod tables;

pub use exclusion::is_trust_excluded;
pub use tables::TrustExclusionTables;

use bouncer_core::{AccountId, TrustId, TrustSession};
use bouncer_store::{Store, StoreResult};

/// Default trust window (spec §4.6 "e.g. 600 s").
pub const DEFAULT_TRUST_DURATION_SECS: i64 = 600;
/// Default command ceiling per trust session (spec §4.6 "e.g. 20").
pub const DEFAULT_MAX_COMMANDS: u32 = 20;

/// Outcome of `should_trust_approve`.
#[derive(Debug, Clone)]
pub enum TrustDecision {
    /// The command may run silently under the named session.
    Approve {
        /// The session consumed for this decision.
        session: TrustSession,
        /// Human-readable reason, including seconds remaining.
        reason: String,
    },
    /// Fresh approval is required.
    Deny {
        /// Why trust did not apply.
        reason: String,
    },
}

/// Create or refresh a trust session for `(source, account)` (spec §4.6
/// "Create"). Upserts on the deterministic `trust_id` so re-granting trust
/// for the same pair replaces the prior window rather than stacking rows.
pub async fn create_trust_session(
    store: &Store,
    source: &str,
    account_id: &AccountId,
    approved_by: &str,
    duration_secs: i64,
    max_commands: u32,
) -> StoreResult<TrustSession> {
    let trust_id = TrustId::derive(source, &account_id.0);
    let now = bouncer_core::Timestamp::now();
    let session = TrustSession {
        trust_id,
        source: source.to_owned(),
        account_id: account_id.clone(),
        approved_by: approved_by.to_owned(),
        created_at: now,
        expires_at: now.plus_seconds(duration_secs),
        command_count: 0,
        max_commands,
        upload_count: 0,
        upload_bytes_total: 0,
        max_uploads: 5,
    };
    store.trust_sessions().upsert(&session).await?;
    Ok(session)
}

/// `get_trust(source, account)` (spec §4.6 "Lookup").
pub async fn get_trust(store: &Store, source: &str, account_id: &str) -> StoreResult<Option<TrustSession>> {
    store.trust_sessions().get_active(source, account_id).await
}

/// `should_trust_approve(cmd, source, account)` (spec §4.6 "Auto-approve
/// decision"): evaluates the six-step decision ladder, consulting the store
/// only once. `trust_enabled` models "trust disabled / no source → no"
/// (step 1) at the call site, since source presence is a caller concern.
pub async fn should_trust_approve(
    store: &Store,
    trust_enabled: bool,
    cmd: &str,
    source: &str,
    account_id: &str,
    tables: &TrustExclusionTables,
) -> StoreResult<TrustDecision> {
    if !trust_enabled || source.is_empty() {
        return Ok(TrustDecision::Deny {
            reason: "trust disabled or no source provided".to_owned(),
        });
    }

    let Some(session) = get_trust(store, source, account_id).await? else {
        return Ok(TrustDecision::Deny {
            reason: "no active trust session".to_owned(),
        });
    };

    if session.command_count >= session.max_commands {
        return Ok(TrustDecision::Deny {
            reason: format!("trust session command ceiling reached ({}/{})", session.command_count, session.max_commands),
        });
    }

    if is_trust_excluded(cmd, tables) {
        return Ok(TrustDecision::Deny {
            reason: "command is trust-excluded; fresh approval required".to_owned(),
        });
    }

    let remaining = session.expires_at.remaining_seconds();
    if remaining == 0 {
        return Ok(TrustDecision::Deny {
            reason: "trust session has expired".to_owned(),
        });
    }

    Ok(TrustDecision::Approve {
        reason: format!("trust session active, {remaining}s remaining"),
        session,
    })
}

/// `Consumption` (spec §4.6): atomically bump `command_count` after the
/// executor runs a trust-approved command.
pub async fn consume_trust_session(store: &Store, trust_id: &str) -> StoreResult<u32> {
    store.trust_sessions().increment_command_count(trust_id).await
}

/// `Revoke` (spec §4.6): direct delete of the row.
pub async fn revoke_trust_session(store: &Store, trust_id: &str) -> StoreResult<()> {
    store.trust_sessions().revoke(trust_id).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_trust_denies_without_store_lookup() {
        let db = bouncer_store::Database::connect_memory().await.unwrap();
        let store = Store::new(db);
        let tables = TrustExclusionTables::default();
        let decision = should_trust_approve(&store, false, "aws s3 ls", "agent-1", "111111111111", &tables).await.unwrap();
        assert!(matches!(decision, TrustDecision::Deny { .. }));
    }

    #[tokio::test]
    async fn create_then_lookup_round_trips() {
        let db = bouncer_store::Database::connect_memory().await.unwrap();
        let store = Store::new(db);
        let account = AccountId::from("111111111111");
        create_trust_session(&store, "agent-1", &account, "alice", DEFAULT_TRUST_DURATION_SECS, DEFAULT_MAX_COMMANDS)
            .await
            .unwrap();
        let found = get_trust(&store, "agent-1", "111111111111").await.unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn active_session_within_limits_approves() {
        let db = bouncer_store::Database::connect_memory().await.unwrap();
        let store = Store::new(db);
        let account = AccountId::from("111111111111");
        create_trust_session(&store, "agent-1", &account, "alice", DEFAULT_TRUST_DURATION_SECS, DEFAULT_MAX_COMMANDS)
            .await
            .unwrap();
        let tables = TrustExclusionTables::default();
        let decision = should_trust_approve(&store, true, "aws s3 ls", "agent-1", "111111111111", &tables).await.unwrap();
        assert!(matches!(decision, TrustDecision::Approve { .. }));
    }

    #[tokio::test]
    async fn excluded_command_denies_even_with_active_session() {
        let db = bouncer_store::Database::connect_memory().await.unwrap();
        let store = Store::new(db);
        let account = AccountId::from("111111111111");
        create_trust_session(&store, "agent-1", &account, "alice", DEFAULT_TRUST_DURATION_SECS, DEFAULT_MAX_COMMANDS)
            .await
            .unwrap();
        let tables = TrustExclusionTables::default();
        let decision = should_trust_approve(&store, true, "aws iam create-user --user-name x", "agent-1", "111111111111", &tables)
            .await
            .unwrap();
        assert!(matches!(decision, TrustDecision::Deny { .. }));
    }
}
