//! Grant-Session Subsystem (C7, spec §4.7).
//!
//! A pre-approved batch of up to 20 commands: normalize, precheck,
//! approve under a mode, then atomically consume per-command usage against
//! the store.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod pattern;
mod precheck;

pub use pattern::{compile_pattern, is_pattern, matches_pattern};
pub use precheck::{precheck_command, REQUIRES_INDIVIDUAL_THRESHOLD};

use bouncer_classifier::ClassifierTables;
use bouncer_compliance::ComplianceTable;
use bouncer_core::{AccountId, GrantApprovalMode, GrantCommandCategory, GrantId, GrantSession, GrantStatus, Timestamp};
use bouncer_risk::RiskRules;
use bouncer_store::{Store, StoreError, StoreResult};
use bouncer_trust::TrustExclusionTables;

/// Maximum commands accepted into one grant request (spec §3).
pub const MAX_GRANT_COMMANDS: usize = 20;
/// Clamped TTL bounds in minutes (spec §3 "ttl_minutes: u32 (clamped 1..=60)").
pub const MIN_TTL_MINUTES: u32 = 1;
/// See [`MIN_TTL_MINUTES`].
pub const MAX_TTL_MINUTES: u32 = 60;

/// Build a pending grant request: normalize and precheck every submitted
/// command, then insert in `pending_approval` (spec §4.7).
#[allow(clippy::too_many_arguments)]
pub async fn request_grant(
    store: &Store,
    source: &str,
    account_id: &AccountId,
    commands: &[String],
    ttl_minutes: u32,
    max_total_executions: u32,
    allow_repeat: bool,
    compliance: &ComplianceTable,
    classifier: &ClassifierTables,
    exclusion: &TrustExclusionTables,
    risk_rules: &RiskRules,
) -> StoreResult<GrantSession> {
    let is_default_account = store.accounts().default_account().await?.is_some_and(|default| default.account_id == *account_id);

    let commands_detail = commands
        .iter()
        .take(MAX_GRANT_COMMANDS)
        .map(|cmd| precheck_command(cmd, source, &account_id.0, is_default_account, compliance, classifier, exclusion, risk_rules))
        .collect();

    let session = GrantSession {
        grant_id: GrantId::new(),
        source: source.to_owned(),
        account_id: account_id.clone(),
        commands_detail,
        granted_commands: Vec::new(),
        used_commands: std::collections::HashMap::new(),
        total_executions: 0,
        max_total_executions,
        allow_repeat,
        status: GrantStatus::PendingApproval,
        approval_mode: None,
        ttl_minutes: ttl_minutes.clamp(MIN_TTL_MINUTES, MAX_TTL_MINUTES),
        expires_at: None,
    };
    store.grant_sessions().put(&session).await?;
    Ok(session)
}

/// Approve a pending grant under `mode` (spec §4.7 "Approval modes"):
/// `all` grants every `grantable` and `requires_individual` command; `safe_only`
/// grants only `grantable`. Denied/blocked rows are never granted.
#[allow(clippy::arithmetic_side_effects)] // ttl_minutes is clamped 1..=60 at request time
pub async fn approve_grant(store: &Store, grant_id: &str, mode: GrantApprovalMode) -> StoreResult<bool> {
    let Some(mut session) = store.grant_sessions().get(grant_id).await? else {
        return Err(StoreError::NotFound(grant_id.to_owned()));
    };

    let granted_commands = session
        .commands_detail
        .iter()
        .filter(|detail| match (mode, detail.category) {
            (_, GrantCommandCategory::Grantable) => true,
            (GrantApprovalMode::All, GrantCommandCategory::RequiresIndividual) => true,
            _ => false,
        })
        .map(|detail| detail.normalized.clone())
        .collect();

    session.status = GrantStatus::Active;
    session.approval_mode = Some(mode);
    session.granted_commands = granted_commands;
    session.expires_at = Some(Timestamp::now().plus_seconds(i64::from(session.ttl_minutes) * 60));

    store.grant_sessions().approve(grant_id, &session).await
}

/// Deny a pending grant.
pub async fn deny_grant(store: &Store, grant_id: &str) -> StoreResult<bool> {
    store.grant_sessions().deny(grant_id).await
}

/// Revoke an active grant outright.
pub async fn revoke_grant(store: &Store, grant_id: &str) -> StoreResult<bool> {
    store.grant_sessions().revoke(grant_id).await
}

/// `try_use(grant_id, normalized_cmd, allow_repeat)` (spec §4.7
/// "Consumption"): exact match is checked first; pattern match is only
/// attempted if no exact match exists.
pub async fn try_use_grant(store: &Store, grant_id: &str, normalized_cmd: &str) -> StoreResult<GrantSession> {
    let session = store.grant_sessions().get(grant_id).await?.ok_or_else(|| StoreError::NotFound(grant_id.to_owned()))?;

    let matched = session.granted_commands.iter().find(|granted| granted.as_str() == normalized_cmd).or_else(|| {
        session
            .granted_commands
            .iter()
            .find(|granted| is_pattern(granted) && matches_pattern(normalized_cmd, granted))
    });

    let Some(matched_pattern) = matched else {
        return Err(StoreError::Conflict(format!("command not granted under {grant_id}")));
    };

    store.grant_sessions().try_use_grant_command(grant_id, matched_pattern, Timestamp::now()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use bouncer_compliance::default_rules;

    async fn harness() -> (Store, ComplianceTable, ClassifierTables, TrustExclusionTables, RiskRules) {
        let db = bouncer_store::Database::connect_memory().await.unwrap();
        (
            Store::new(db),
            ComplianceTable::compile(default_rules(&[])).unwrap(),
            ClassifierTables::default(),
            TrustExclusionTables::default(),
            RiskRules::default(),
        )
    }

    #[tokio::test]
    async fn safe_only_mode_excludes_requires_individual_commands() {
        let (store, compliance, classifier, exclusion, rules) = harness().await;
        let account = AccountId::from("111111111111");
        let commands = vec!["aws s3 ls".to_owned(), "aws ec2 terminate-instances --instance-ids i-1".to_owned()];
        let session = request_grant(&store, "agent-1", &account, &commands, 30, 40, false, &compliance, &classifier, &exclusion, &rules)
            .await
            .unwrap();
        approve_grant(&store, &session.grant_id.0, GrantApprovalMode::SafeOnly).await.unwrap();
        let approved = store.grant_sessions().get(&session.grant_id.0).await.unwrap().unwrap();
        assert_eq!(approved.granted_commands, vec!["aws s3 ls".to_owned()]);
    }

    #[tokio::test]
    async fn exact_match_is_single_use_without_allow_repeat() {
        let (store, compliance, classifier, exclusion, rules) = harness().await;
        let account = AccountId::from("111111111111");
        let commands = vec!["aws s3 ls".to_owned()];
        let session = request_grant(&store, "agent-1", &account, &commands, 30, 40, false, &compliance, &classifier, &exclusion, &rules)
            .await
            .unwrap();
        approve_grant(&store, &session.grant_id.0, GrantApprovalMode::All).await.unwrap();

        try_use_grant(&store, &session.grant_id.0, "aws s3 ls").await.unwrap();
        let second = try_use_grant(&store, &session.grant_id.0, "aws s3 ls").await;
        assert!(second.is_err());
    }
}
