//! Execution Pipeline (C8, spec §4.8): the ordered, short-circuiting flow
//! every `execute` call passes through before a command either runs or is
//! handed to an approver.

use std::collections::HashMap;

use bouncer_core::{Account, Action, OutputPage, Request, RequestId, RequestStatus, RiskCategory, Timestamp, TrustScope};
use bouncer_exec::ExecOutput;
use bouncer_risk::{calculate_risk, RiskInput};
use bouncer_trust::TrustDecision;
use tracing::{info, warn};

use crate::audit;
use crate::config::PipelineContext;
use crate::error::{PipelineError, PipelineResult};
use crate::rate_limit::{self, RateLimitOutcome};
use crate::render;

/// Output longer than this is paged rather than inlined (spec §4.5 output
/// paging, §3 `OutputPage`).
const OUTPUT_INLINE_LIMIT: usize = 3500;
const OUTPUT_PAGE_SIZE: usize = 3500;
/// Output pages outlive their request by this much (spec §3 TTL sweep).
const OUTPUT_PAGE_TTL_SECS: i64 = 3600;

/// One `execute` call (spec §4.1 step 1, §6 tool surface).
#[derive(Debug, Clone)]
pub struct ExecuteInput {
    /// Raw command string, unparsed.
    pub command: String,
    /// Requesting agent's trust-grouping key (spec §3/§9).
    pub trust_scope: TrustScope,
    /// Caller-supplied justification.
    pub reason: String,
    /// Explicit agent identifier, if distinct from `trust_scope`.
    pub source: Option<String>,
    /// Target account id; falls back to the registered default account.
    pub account: Option<String>,
    /// Free-form caller context.
    pub context: Option<String>,
    /// A grant id to attempt consumption against before anything else.
    pub grant_id: Option<String>,
}

/// What `submit_execute` resolved to.
#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    /// Classifier or compliance rejected the command outright.
    Blocked {
        /// The terminal request id.
        request_id: String,
        /// Why it was blocked.
        reason: String,
    },
    /// Bypassed approval (grant consumption, safelist, or trust session).
    AutoApproved {
        /// The terminal request id.
        request_id: String,
        /// Executor exit code.
        exit_code: i32,
        /// Captured output (may be a paging pointer for long output).
        result: String,
    },
    /// An approval prompt was posted; the caller should poll `status`.
    PendingApproval {
        /// The request id to poll.
        request_id: String,
    },
    /// Something failed outside the normal business-error taxonomy.
    Error {
        /// The terminal request id, if one was created.
        request_id: String,
        /// What went wrong.
        reason: String,
    },
}

/// Run one command through the full pipeline (spec §4.8 steps 1-10; step 11
/// "wait" is the caller's concern — `PendingApproval` just means "poll
/// `status`").
pub async fn submit_execute(ctx: &PipelineContext, input: ExecuteInput) -> PipelineResult<PipelineOutcome> {
    // Step 1: parse & validate.
    if input.command.trim().is_empty() {
        return Err(PipelineError::Validation("command must not be empty".to_owned()));
    }
    if input.trust_scope.as_str().trim().is_empty() {
        return Err(PipelineError::Validation("trust_scope is required".to_owned()));
    }

    // Step 2: resolve target account.
    let account = resolve_account(ctx, input.account.as_deref()).await?;

    let now = Timestamp::now();
    let source = input.source.clone().unwrap_or_else(|| input.trust_scope.to_string());
    let normalized = bouncer_classifier::normalize_lower(&input.command);

    let mut request = Request {
        request_id: RequestId::new(),
        source: Some(source.clone()),
        account_id: Some(account.account_id.clone()),
        command: input.command.clone(),
        reason: input.reason.clone(),
        context: input.context.clone(),
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
        expires_at: now.plus_seconds(ctx.approval_timeout_secs),
        ttl: now.plus_seconds(ctx.approval_timeout_secs + ctx.ttl_buffer_secs),
    };

    // Step 3: grant check.
    if let Some(grant_id) = &input.grant_id {
        match bouncer_grant::try_use_grant(&ctx.store, grant_id, &normalized).await {
            Ok(_grant) => return run_to_completion(ctx, &mut request, &account, "grant_consumption").await,
            Err(bouncer_store::StoreError::Conflict(reason)) => {
                info!(grant_id, %reason, "grant did not cover this command, continuing pipeline");
            }
            Err(error) => return Err(error.into()),
        }
    }

    // Step 4: compliance.
    if let Some(violation) = ctx.compliance.check(&input.command) {
        let reason = format!("{}: {}", violation.rule_name, violation.remediation);
        return terminate_blocked(ctx, request, &reason, serde_json::json!({"rule_id": violation.rule_id})).await;
    }

    // Step 5: blocked classifier.
    let verdict = ctx.classifier.is_blocked(&input.command);
    if verdict.blocked {
        let reason = verdict.reason.unwrap_or_else(|| "blocked by classifier".to_owned());
        return terminate_blocked(ctx, request, &reason, serde_json::json!({})).await;
    }

    // Step 6: auto-approve classifier.
    if ctx.classifier.is_auto_approve(&input.command) {
        return run_to_completion(ctx, &mut request, &account, "safelist").await;
    }

    // Step 7: rate limits.
    match rate_limit::check(ctx, &source).await? {
        RateLimitOutcome::Allow => {}
        RateLimitOutcome::RateLimitExceeded => {
            return terminate_error(ctx, request, "rate_limit_exceeded").await;
        }
        RateLimitOutcome::PendingLimitExceeded => {
            return terminate_error(ctx, request, "pending_limit_exceeded").await;
        }
    }

    // Step 8: trust-session auto-approve.
    let trust_decision =
        bouncer_trust::should_trust_approve(&ctx.store, ctx.trust_enabled, &input.command, &source, &account.account_id.0, &ctx.exclusion).await?;
    if let TrustDecision::Approve { session, reason } = trust_decision {
        let outcome = run_to_completion(ctx, &mut request, &account, "trust").await?;
        let count = bouncer_trust::consume_trust_session(&ctx.store, &session.trust_id.0).await?;
        info!(reason, trust_id = %session.trust_id, "trust session auto-approved command");
        notify_trust_auto_execute(ctx, &request, &session.trust_id.0, count, session.max_commands).await;
        return Ok(outcome);
    }

    // Step 9: risk score & smart-approval (shadow-only: only a `block`
    // category changes the outcome; the score is otherwise recorded for
    // forensics and surfaced in the approval prompt).
    let risk = calculate_risk(
        &RiskInput {
            command: &input.command,
            reason: &input.reason,
            source: &source,
            account_id: &account.account_id.0,
            is_default_account: account.is_default,
        },
        &ctx.risk_rules,
    );
    request.risk_score = Some(risk.score);
    request.risk_category = Some(risk.category);
    request.risk_factors = risk.factors.clone();

    if risk.category == RiskCategory::Block {
        return terminate_blocked(ctx, request, "risk score exceeded the automatic-block threshold", serde_json::json!({"score": risk.score})).await;
    }

    // Step 10: submit for approval.
    ctx.store.requests().put(&request).await?;
    let dangerous = ctx.classifier.is_dangerous(&input.command);
    let keyboard = bouncer_chat::approval_keyboard(&request.request_id.to_string(), dangerous);
    let risk_note = format!("Risk: {} ({})", risk.score, risk.category);
    let prompt = render::prompt_card(&request, Some(&risk_note));

    match ctx.chat.send(ctx.chat_id, &prompt, Some(keyboard)).await {
        Ok(message_id) => {
            request.chat_message_id = Some(message_id.0.to_string());
            ctx.store.requests().put_overwrite(&request).await?;
            audit::append(ctx, &request, "system", "pending_approval", serde_json::json!({})).await;
            Ok(PipelineOutcome::PendingApproval {
                request_id: request.request_id.to_string(),
            })
        }
        Err(error) => {
            warn!(%error, request_id = %request.request_id, "failed to send approval prompt");
            request.status = RequestStatus::Error;
            request.decided_at = Some(Timestamp::now());
            ctx.store.requests().put_overwrite(&request).await?;
            audit::append(ctx, &request, "system", "error", serde_json::json!({"error": error.to_string()})).await;
            Ok(PipelineOutcome::Error {
                request_id: request.request_id.to_string(),
                reason: "failed to notify approver".to_owned(),
            })
        }
    }
}

async fn terminate_blocked(ctx: &PipelineContext, mut request: Request, reason: &str, details: serde_json::Value) -> PipelineResult<PipelineOutcome> {
    request.status = RequestStatus::Blocked;
    request.decided_at = Some(Timestamp::now());
    ctx.store.requests().put(&request).await?;
    audit::append(ctx, &request, "system", "blocked", details).await;
    if let Err(error) = ctx.chat.send_silent(ctx.chat_id, &render::blocked_card(&request, reason), None).await {
        warn!(%error, request_id = %request.request_id, "failed to send blocked notification");
    }
    Ok(PipelineOutcome::Blocked {
        request_id: request.request_id.to_string(),
        reason: reason.to_owned(),
    })
}

async fn terminate_error(ctx: &PipelineContext, mut request: Request, decision: &str) -> PipelineResult<PipelineOutcome> {
    request.status = RequestStatus::Error;
    request.decided_at = Some(Timestamp::now());
    ctx.store.requests().put(&request).await?;
    audit::append(ctx, &request, "system", decision, serde_json::json!({})).await;
    Ok(PipelineOutcome::Error {
        request_id: request.request_id.to_string(),
        reason: decision.to_owned(),
    })
}

/// Shared tail for the grant/safelist/trust short-circuits (spec §4.8
/// "on success go to execute", "terminal `auto_approved`").
async fn run_to_completion(
    ctx: &PipelineContext,
    request: &mut Request,
    account: &Account,
    decision_label: &str,
) -> PipelineResult<PipelineOutcome> {
    let ambient: HashMap<String, String> = std::env::vars().collect();
    match bouncer_exec::execute_command(&request.command, account.role_arn.as_deref(), bouncer_exec::DEFAULT_TIMEOUT, &ambient, ctx.role_assumer.as_deref())
        .await
    {
        Ok(output) => {
            record_output(ctx, request, &output).await?;
            request.status = RequestStatus::AutoApproved;
            request.decided_at = Some(Timestamp::now());
            ctx.store.requests().put(request).await?;
            audit::append(ctx, request, "system", decision_label, serde_json::json!({"exit_code": output.exit_code})).await;
            Ok(PipelineOutcome::AutoApproved {
                request_id: request.request_id.to_string(),
                exit_code: output.exit_code,
                result: request.result.clone().unwrap_or_default(),
            })
        }
        Err(error) => {
            request.status = RequestStatus::Error;
            request.decided_at = Some(Timestamp::now());
            request.result = Some(error.to_string());
            ctx.store.requests().put(request).await?;
            audit::append(ctx, request, "system", "error", serde_json::json!({"error": error.to_string()})).await;
            Ok(PipelineOutcome::Error {
                request_id: request.request_id.to_string(),
                reason: error.to_string(),
            })
        }
    }
}

async fn record_output(ctx: &PipelineContext, request: &mut Request, output: &ExecOutput) -> PipelineResult<()> {
    request.exit_code = Some(output.exit_code);
    if output.output.chars().count() <= OUTPUT_INLINE_LIMIT {
        request.result = Some(output.output.clone());
        return Ok(());
    }

    let pages = paginate(&output.output, OUTPUT_PAGE_SIZE);
    let total_pages = pages.len() as u32;
    let ttl = Timestamp::now().plus_seconds(OUTPUT_PAGE_TTL_SECS);
    let request_id = request.request_id.to_string();
    for (index, content) in pages.into_iter().enumerate() {
        let page = OutputPage {
            request_id: request_id.clone(),
            page: index as u32 + 1,
            total_pages,
            content,
            ttl,
        };
        ctx.store.output_pages().put_page(&page).await?;
    }
    request.result = Some(format!("output split into {total_pages} pages; use get_page({request_id}, 1..{total_pages})"));
    Ok(())
}

fn paginate(text: &str, page_size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(page_size).map(|chunk| chunk.iter().collect()).collect()
}

pub(crate) async fn resolve_account(ctx: &PipelineContext, account_id: Option<&str>) -> PipelineResult<Account> {
    let found = match account_id {
        Some(id) => ctx.store.accounts().get(id).await?,
        None => ctx.store.accounts().default_account().await?,
    };
    found.filter(|account| account.enabled).ok_or_else(|| PipelineError::Validation("no usable target account".to_owned()))
}

async fn notify_trust_auto_execute(ctx: &PipelineContext, request: &Request, trust_id: &str, command_count: u32, max_commands: u32) {
    let text = render::trust_auto_execute_card(request, command_count, max_commands);
    let keyboard = bouncer_chat::revoke_keyboard(trust_id);
    if let Err(error) = ctx.chat.send_silent(ctx.chat_id, &text, Some(keyboard)).await {
        warn!(%error, request_id = %request.request_id, "failed to send trust auto-execute notification");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paginate_splits_on_char_boundaries() {
        let text = "a".repeat(10);
        let pages = paginate(&text, 4);
        assert_eq!(pages, vec!["aaaa".to_owned(), "aaaa".to_owned(), "aa".to_owned()]);
    }

    #[test]
    fn paginate_keeps_single_page_intact() {
        let pages = paginate("short", 100);
        assert_eq!(pages, vec!["short".to_owned()]);
    }
}
