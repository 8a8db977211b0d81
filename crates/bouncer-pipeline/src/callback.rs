//! Callback Handler (C10, spec §4.10): resolves one inline-button press into
//! a state transition. The message edit and the callback-answer are issued
//! in parallel to hide round-trip latency, as the approval prompt's buttons
//! must disappear from the approver's screen no slower than the toast does.

use async_trait::async_trait;
use bouncer_chat::{CallbackSink, ChatCallback};
use bouncer_core::{Account, Action, Request, RequestStatus, Timestamp};
use tracing::warn;

use crate::audit;
use crate::config::PipelineContext;
use crate::error::{PipelineError, PipelineResult};
use crate::execute;
use crate::render;

/// Adapts a [`PipelineContext`] to the chat poller's [`CallbackSink`].
#[derive(Clone)]
pub struct CallbackHandler {
    ctx: PipelineContext,
}

impl CallbackHandler {
    /// Wrap `ctx` as a callback sink.
    #[must_use]
    pub fn new(ctx: PipelineContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl CallbackSink for CallbackHandler {
    async fn handle_callback(&self, callback: ChatCallback) {
        if let Err(error) = dispatch(&self.ctx, &callback).await {
            warn!(%error, request_id = callback.request_id, action = callback.action, "callback handling failed");
        }
    }
}

async fn dispatch(ctx: &PipelineContext, callback: &ChatCallback) -> PipelineResult<()> {
    if !ctx.is_authorized_approver(callback.approver_id) {
        ctx.chat.answer(&callback.callback_id, "You are not authorized to approve requests").await.ok();
        return Err(PipelineError::NotAuthorized);
    }

    match callback.action.as_str() {
        "approve" => handle_decision(ctx, callback, RequestStatus::Approved, false).await,
        "approve_trust" => handle_decision(ctx, callback, RequestStatus::Approved, true).await,
        "deny" => handle_decision(ctx, callback, RequestStatus::Denied, false).await,
        "revoke_trust" => handle_revoke_trust(ctx, callback).await,
        "account_approve" => handle_account_decision(ctx, callback, true).await,
        "account_deny" => handle_account_decision(ctx, callback, false).await,
        "grant_all" => handle_grant_decision(ctx, callback, Some(bouncer_core::GrantApprovalMode::All)).await,
        "grant_safe" => handle_grant_decision(ctx, callback, Some(bouncer_core::GrantApprovalMode::SafeOnly)).await,
        "grant_deny" => handle_grant_decision(ctx, callback, None).await,
        other => {
            ctx.chat.answer(&callback.callback_id, "Unknown action").await.ok();
            Err(PipelineError::Validation(format!("unknown callback action {other}")))
        }
    }
}

/// `approve`/`approve_trust`/`deny` (spec §4.10): claims the row out of
/// `pending_approval` via `try_transition_from_pending` *before* touching the
/// executor, so a redelivered or concurrently-processed callback can only
/// ever win the claim once. Only the claim's winner runs the command (or
/// finalizes an upload) and persists the outcome; a loser answers "Already
/// handled" without ever invoking the executor.
async fn handle_decision(ctx: &PipelineContext, callback: &ChatCallback, target: RequestStatus, grant_trust: bool) -> PipelineResult<()> {
    let Some(mut request) = ctx.store.requests().get(&callback.request_id).await? else {
        ctx.chat.answer(&callback.callback_id, "Request not found").await.ok();
        return Err(PipelineError::NotFound(callback.request_id.clone()));
    };
    if request.status != RequestStatus::PendingApproval {
        ctx.chat.answer(&callback.callback_id, "Already handled").await.ok();
        return Err(PipelineError::AlreadyHandled(callback.request_id.clone()));
    }

    let approver = callback.approver_id.to_string();
    request.status = target;
    request.approved_by = Some(approver.clone());
    request.decided_at = Some(Timestamp::now());
    if target == RequestStatus::Approved {
        request.approved_at = Some(Timestamp::now());
    }

    let transitioned = ctx.store.requests().try_transition_from_pending(&callback.request_id, &request).await?;
    if !transitioned {
        ctx.chat.answer(&callback.callback_id, "Already handled").await.ok();
        return Err(PipelineError::AlreadyHandled(callback.request_id.clone()));
    }

    if target == RequestStatus::Approved {
        match request.action {
            Action::Upload | Action::UploadBatch => finalize_upload(&mut request),
            _ => match execute::resolve_account(ctx, request.account_id.as_ref().map(|id| id.0.as_str())).await {
                Ok(account) => run_command(ctx, &mut request, &account).await,
                Err(error) => {
                    request.status = RequestStatus::Error;
                    request.result = Some(error.to_string());
                }
            },
        }
        ctx.store.requests().put_overwrite(&request).await?;
    }

    audit::append(
        ctx,
        &request,
        &approver,
        if target == RequestStatus::Approved { "approved" } else { "denied" },
        serde_json::json!({}),
    )
    .await;

    if grant_trust && request.status == RequestStatus::Approved {
        if let (Some(source), Some(account_id)) = (request.source.clone(), request.account_id.clone()) {
            if let Err(error) = bouncer_trust::create_trust_session(
                &ctx.store,
                &source,
                &account_id,
                &approver,
                bouncer_trust::DEFAULT_TRUST_DURATION_SECS,
                bouncer_trust::DEFAULT_MAX_COMMANDS,
            )
            .await
            {
                warn!(%error, "failed to create trust session after approve_trust");
            }
        }
    }

    let text = match request.status {
        RequestStatus::Denied => render::denial_card(&request),
        _ => render::result_card(&request),
    };
    let answer_text = match request.status {
        RequestStatus::Approved => "Approved",
        RequestStatus::Denied => "Denied",
        RequestStatus::Error => "Executed with an error",
        _ => "Updated",
    };
    edit_and_answer(ctx, callback, &text, answer_text).await;
    Ok(())
}

async fn run_command(ctx: &PipelineContext, request: &mut Request, account: &Account) {
    let ambient: std::collections::HashMap<String, String> = std::env::vars().collect();
    match bouncer_exec::execute_command(&request.command, account.role_arn.as_deref(), bouncer_exec::DEFAULT_TIMEOUT, &ambient, ctx.role_assumer.as_deref())
        .await
    {
        Ok(output) => {
            request.exit_code = Some(output.exit_code);
            request.result = Some(output.output);
            request.status = if output.exit_code == 0 { RequestStatus::Approved } else { RequestStatus::Error };
        }
        Err(error) => {
            request.status = RequestStatus::Error;
            request.result = Some(error.to_string());
        }
    }
}

/// Synthetic staging write for an approved `upload`/`upload_batch` request:
/// no real object store is involved (spec §6 scopes out the orchestrator's
/// implementation), so the "write" is just deriving a staging key per file
/// from the hash already computed at submission time.
fn finalize_upload(request: &mut Request) {
    let files: Vec<crate::upload::UploadFileMeta> = request.context.as_deref().and_then(|raw| serde_json::from_str(raw).ok()).unwrap_or_default();
    let keys = files
        .iter()
        .map(|file| format!("uploads/{}/{}-{}", request.request_id, &file.sha256[..16.min(file.sha256.len())], file.filename))
        .collect::<Vec<_>>();
    request.result = Some(serde_json::json!({"staged": keys}).to_string());
    request.exit_code = Some(0);
    request.status = RequestStatus::Approved;
}

/// `revoke_trust` (spec §4.6 "Revoke", §4.10): `callback.request_id` carries
/// the trust id here, not a request id.
async fn handle_revoke_trust(ctx: &PipelineContext, callback: &ChatCallback) -> PipelineResult<()> {
    bouncer_trust::revoke_trust_session(&ctx.store, &callback.request_id).await?;
    let edit = async {
        if let Some(message_id) = callback.origin_message_id {
            if let Err(error) = ctx.chat.edit(callback.chat_id, message_id, "<b>Trust revoked</b>", None).await {
                warn!(%error, "failed to edit trust notification after revoke");
            }
        }
    };
    let answer = async {
        if let Err(error) = ctx.chat.answer(&callback.callback_id, "Trust revoked").await {
            warn!(%error, "failed to answer revoke_trust callback");
        }
    };
    tokio::join!(edit, answer);
    Ok(())
}

/// `account_approve`/`account_deny` (spec §4.7 account-registration
/// approval): shares the same pending-request automaton as command
/// approval, just with `Action::AddAccount` rows.
async fn handle_account_decision(ctx: &PipelineContext, callback: &ChatCallback, approve: bool) -> PipelineResult<()> {
    let Some(mut request) = ctx.store.requests().get(&callback.request_id).await? else {
        ctx.chat.answer(&callback.callback_id, "Request not found").await.ok();
        return Err(PipelineError::NotFound(callback.request_id.clone()));
    };
    if request.status != RequestStatus::PendingApproval {
        ctx.chat.answer(&callback.callback_id, "Already handled").await.ok();
        return Err(PipelineError::AlreadyHandled(callback.request_id.clone()));
    }

    let approver = callback.approver_id.to_string();
    request.status = if approve { RequestStatus::Approved } else { RequestStatus::Denied };
    request.approved_by = Some(approver.clone());
    request.decided_at = Some(Timestamp::now());
    if approve {
        request.approved_at = Some(Timestamp::now());
    }

    let transitioned = ctx.store.requests().try_transition_from_pending(&callback.request_id, &request).await?;
    if !transitioned {
        ctx.chat.answer(&callback.callback_id, "Already handled").await.ok();
        return Err(PipelineError::AlreadyHandled(callback.request_id.clone()));
    }

    if approve {
        if let Some(account_id) = request.account_id.clone() {
            match request.action {
                Action::RemoveAccount => {
                    if let Err(error) = ctx.store.accounts().remove(&account_id.0).await {
                        warn!(%error, "failed to remove approved account");
                    }
                }
                _ => {
                    let account = Account {
                        name: account_id.0.clone(),
                        account_id,
                        role_arn: request.context.clone(),
                        enabled: true,
                        is_default: false,
                        created_at: Timestamp::now(),
                    };
                    if let Err(error) = ctx.store.accounts().put(&account).await {
                        warn!(%error, "failed to register approved account");
                    }
                }
            }
        }
    }

    audit::append(ctx, &request, &approver, if approve { "account_approved" } else { "account_denied" }, serde_json::json!({})).await;

    let text = if approve { "<b>Account approved</b>".to_owned() } else { "<b>Account registration denied</b>".to_owned() };
    let answer_text = if approve { "Account approved" } else { "Account denied" };
    edit_and_answer(ctx, callback, &text, answer_text).await;
    Ok(())
}

/// `grant_all`/`grant_safe`/`grant_deny` (spec §4.7 "Approval modes"):
/// `callback.request_id` carries the grant id here, not a request id.
async fn handle_grant_decision(ctx: &PipelineContext, callback: &ChatCallback, mode: Option<bouncer_core::GrantApprovalMode>) -> PipelineResult<()> {
    let grant_id = &callback.request_id;
    let (transitioned, text, answer_text) = match mode {
        Some(mode) => {
            let ok = bouncer_grant::approve_grant(&ctx.store, grant_id, mode).await?;
            (ok, "<b>Grant approved</b>".to_owned(), "Grant approved")
        }
        None => {
            let ok = bouncer_grant::deny_grant(&ctx.store, grant_id).await?;
            (ok, "<b>Grant denied</b>".to_owned(), "Grant denied")
        }
    };
    if !transitioned {
        ctx.chat.answer(&callback.callback_id, "Already handled").await.ok();
        return Err(PipelineError::AlreadyHandled(grant_id.clone()));
    }

    let entry = bouncer_core::AuditLogEntry {
        request_id: grant_id.clone(),
        action: if mode.is_some() { "grant_approved".to_owned() } else { "grant_denied".to_owned() },
        actor: callback.approver_id.to_string(),
        details: serde_json::json!({}),
        created_at: Timestamp::now(),
    };
    if let Err(error) = ctx.store.audit_log().append(&entry).await {
        warn!(%error, grant_id, "failed to append grant audit row");
    }

    let edit = async {
        if let Some(message_id) = callback.origin_message_id {
            if let Err(error) = ctx.chat.edit(callback.chat_id, message_id, &text, None).await {
                warn!(%error, "failed to edit grant prompt");
            }
        }
    };
    let answer = async {
        if let Err(error) = ctx.chat.answer(&callback.callback_id, answer_text).await {
            warn!(%error, "failed to answer grant callback");
        }
    };
    tokio::join!(edit, answer);
    Ok(())
}

/// Edits the originating prompt and answers the callback query together,
/// per spec §4.10's latency requirement.
async fn edit_and_answer(ctx: &PipelineContext, callback: &ChatCallback, text: &str, answer_text: &str) {
    let edit = async {
        if let Some(message_id) = callback.origin_message_id {
            if let Err(error) = ctx.chat.edit(callback.chat_id, message_id, text, None).await {
                warn!(%error, "failed to edit approval message");
            }
        }
    };
    let answer = async {
        if let Err(error) = ctx.chat.answer(&callback.callback_id, answer_text).await {
            warn!(%error, "failed to answer callback query");
        }
    };
    tokio::join!(edit, answer);
}

#[cfg(test)]
mod tests {
    use bouncer_core::RequestId;

    use super::*;
    use crate::upload::UploadFileMeta;

    fn blank_request(context: Option<String>) -> Request {
        let now = Timestamp::now();
        Request {
            request_id: RequestId::new(),
            source: Some("agent-1".to_owned()),
            account_id: None,
            command: String::new(),
            reason: "test".to_owned(),
            context,
            action: Action::Upload,
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

    #[test]
    fn finalize_upload_derives_one_staging_key_per_file() {
        let files = vec![UploadFileMeta {
            filename: "report.txt".to_owned(),
            content_type: "text/plain".to_owned(),
            size_bytes: 11,
            sha256: "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9".to_owned(),
        }];
        let mut request = blank_request(Some(serde_json::to_string(&files).unwrap()));

        finalize_upload(&mut request);

        assert_eq!(request.status, RequestStatus::Approved);
        assert_eq!(request.exit_code, Some(0));
        let result: serde_json::Value = serde_json::from_str(request.result.as_deref().unwrap()).unwrap();
        let staged = result["staged"].as_array().unwrap();
        assert_eq!(staged.len(), 1);
        assert!(staged[0].as_str().unwrap().starts_with(&format!("uploads/{}/b94d27b9934d3e08-report.txt", request.request_id)));
    }

    #[test]
    fn finalize_upload_tolerates_missing_context() {
        let mut request = blank_request(None);
        finalize_upload(&mut request);
        assert_eq!(request.status, RequestStatus::Approved);
        let result: serde_json::Value = serde_json::from_str(request.result.as_deref().unwrap()).unwrap();
        assert_eq!(result["staged"].as_array().unwrap().len(), 0);
    }
}
