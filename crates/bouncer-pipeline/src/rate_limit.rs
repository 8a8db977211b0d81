//! Pipeline step 7: per-source rate and pending-request limits (spec §4.4,
//! §4.8, §7 error taxonomy `rate_limit_exceeded`/`pending_limit_exceeded`).

use bouncer_core::Timestamp;
use tracing::warn;

use crate::config::PipelineContext;
use crate::error::PipelineResult;

/// Outcome of the two rate checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitOutcome {
    /// Neither limit was hit.
    Allow,
    /// The per-window request count was exceeded.
    RateLimitExceeded,
    /// Too many requests are already `pending_approval` for this source.
    PendingLimitExceeded,
}

/// Evaluate both limits for `source`. A store error is fail-open (request
/// proceeds) unless `rate_limit.fail_closed` is set, per spec §9's
/// "rate-limit fail-open" resolution.
pub async fn check(ctx: &PipelineContext, source: &str) -> PipelineResult<RateLimitOutcome> {
    let config = &ctx.rate_limit;
    let window_start = Timestamp::now().plus_seconds(-config.window_secs);

    let window_count = match ctx.store.requests().count_in_window(source, window_start).await {
        Ok(count) => count,
        Err(error) if config.fail_closed => return Err(error.into()),
        Err(error) => {
            warn!(%error, source, "rate-limit window query failed, failing open");
            0
        }
    };
    if window_count >= config.max_per_window {
        return Ok(RateLimitOutcome::RateLimitExceeded);
    }

    let pending_count = match ctx.store.requests().count_pending(source).await {
        Ok(count) => count,
        Err(error) if config.fail_closed => return Err(error.into()),
        Err(error) => {
            warn!(%error, source, "pending-limit query failed, failing open");
            0
        }
    };
    if pending_count >= config.max_pending {
        return Ok(RateLimitOutcome::PendingLimitExceeded);
    }

    Ok(RateLimitOutcome::Allow)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bouncer_chat::{ChatChannel, ChatId};
    use bouncer_classifier::ClassifierTables;
    use bouncer_compliance::{default_rules, ComplianceTable};
    use bouncer_core::{Action, Request, RequestId, RequestStatus, Timestamp};
    use bouncer_risk::RiskRules;
    use bouncer_store::{Database, Store};
    use bouncer_trust::TrustExclusionTables;

    use super::*;

    async fn harness(rate_limit: RateLimitConfig) -> PipelineContext {
        let db = Database::connect_memory().await.unwrap();
        PipelineContext {
            store: Arc::new(Store::new(db)),
            chat: Arc::new(ChatChannel::new(bouncer_chat::Bot::new("test:token"))),
            chat_id: ChatId(0),
            classifier: Arc::new(ClassifierTables::default()),
            compliance: Arc::new(ComplianceTable::compile(default_rules(&[])).unwrap()),
            risk_rules: Arc::new(RiskRules::default()),
            exclusion: Arc::new(TrustExclusionTables::default()),
            approvers: Arc::new(Vec::new()),
            rate_limit,
            trust_enabled: true,
            approval_timeout_secs: 300,
            ttl_buffer_secs: 60,
            role_assumer: None,
        }
    }

    fn pending_request(source: &str) -> Request {
        let now = Timestamp::now();
        Request {
            request_id: RequestId::new(),
            source: Some(source.to_owned()),
            account_id: None,
            command: "aws s3 ls".to_owned(),
            reason: "test".to_owned(),
            context: None,
            action: Action::Execute,
            status: RequestStatus::PendingApproval,
            risk_score: None,
            risk_category: None,
            risk_factors: Vec::new(),
            result: None,
            exit_code: None,
            chat_message_id: None,
            approved_by: None,
            created_at: now,
            approved_at: None,
            decided_at: None,
            expires_at: now.plus_seconds(300),
            ttl: now.plus_seconds(360),
        }
    }

    #[tokio::test]
    async fn allows_a_source_under_both_limits() {
        let ctx = harness(RateLimitConfig::default()).await;
        assert_eq!(check(&ctx, "agent-1").await.unwrap(), RateLimitOutcome::Allow);
    }

    #[tokio::test]
    async fn rejects_once_the_per_window_count_is_hit() {
        let mut config = RateLimitConfig::default();
        config.max_per_window = 1;
        let ctx = harness(config).await;
        ctx.store.requests().put(&pending_request("agent-1")).await.unwrap();
        assert_eq!(check(&ctx, "agent-1").await.unwrap(), RateLimitOutcome::RateLimitExceeded);
    }

    #[tokio::test]
    async fn rejects_once_the_pending_count_is_hit() {
        let mut config = RateLimitConfig::default();
        config.max_per_window = 100;
        config.max_pending = 1;
        let ctx = harness(config).await;
        ctx.store.requests().put(&pending_request("agent-1")).await.unwrap();
        assert_eq!(check(&ctx, "agent-1").await.unwrap(), RateLimitOutcome::PendingLimitExceeded);
    }

    #[tokio::test]
    async fn limits_are_scoped_per_source() {
        let mut config = RateLimitConfig::default();
        config.max_per_window = 1;
        let ctx = harness(config).await;
        ctx.store.requests().put(&pending_request("agent-1")).await.unwrap();
        assert_eq!(check(&ctx, "agent-2").await.unwrap(), RateLimitOutcome::Allow);
    }
}
