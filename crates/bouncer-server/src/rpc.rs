//! The agent-facing JSON-RPC tool surface (spec §6).
//!
//! Mirrors `astrid-gateway`'s `#[rpc(server)]` + `RpcImpl` split: the trait
//! is the wire contract, `RpcImpl` is the one stateful type that threads
//! every call through [`bouncer_pipeline::PipelineContext`].

use std::time::Duration;

use bouncer_core::{Action, AccountId, DecisionType, RequestStatus};
use bouncer_pipeline::{AccountActionInput, ExecuteInput, GrantRequestInput, PipelineContext, PipelineOutcome, UploadFileInput};
use jsonrpsee::proc_macros::rpc;
use jsonrpsee::types::ErrorObjectOwned;
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};
use crate::help;
use crate::presigned::{self, PresignedFileRequest};
use crate::wire::{
    AccountInfo, ConfirmUploadResponse, ExecuteResponse, GrantStatusResponse, HelpEntry, HistoryEntry, PageResponse, PendingEntry, PresignedResponse,
    SafelistResponse, StatsResponse, StatusResponse, SubmissionResponse, TrustStatusResponse,
};

/// Max wall-clock time `execute(sync: true)` will poll for before returning
/// whatever state the request is in (spec §5 "the synchronous wait-for-
/// approval loop (250-ms polls, bounded)").
const SYNC_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// One file for `upload_batch`/`request_presigned_batch`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileUpload {
    /// Caller-supplied filename.
    pub filename: String,
    /// MIME type of the payload.
    pub content_type: String,
    /// Base64-encoded content.
    pub content_b64: String,
}

/// One file name/type pair for `request_presigned_batch`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSpec {
    /// Caller-supplied filename.
    pub filename: String,
    /// MIME type to sign the URL against.
    pub content_type: String,
}

/// One confirmed key for `confirm_upload`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmedFile {
    /// Staging-bucket object key the caller claims to have uploaded.
    pub s3_key: String,
}

#[rpc(server, namespace = "bouncer")]
pub trait BouncerRpc {
    /// Run a command through the execution pipeline (spec §4.8 entry point).
    #[method(name = "execute")]
    #[allow(clippy::too_many_arguments)]
    async fn execute(
        &self,
        command: String,
        trust_scope: String,
        reason: String,
        source: Option<String>,
        account: Option<String>,
        context: Option<String>,
        sync: Option<bool>,
        grant_id: Option<String>,
    ) -> Result<ExecuteResponse, ErrorObjectOwned>;

    /// Read a request's current state.
    #[method(name = "status")]
    async fn status(&self, request_id: String) -> Result<StatusResponse, ErrorObjectOwned>;

    /// Fetch a page of a long-captured output (spec §4.5).
    #[method(name = "get_page")]
    async fn get_page(&self, page_id: String) -> Result<PageResponse, ErrorObjectOwned>;

    /// List `pending_approval` requests, optionally filtered by `source`.
    #[method(name = "list_pending")]
    async fn list_pending(&self, source: Option<String>, limit: u32) -> Result<Vec<PendingEntry>, ErrorObjectOwned>;

    /// Return the classifier tables verbatim (spec §6).
    #[method(name = "list_safelist")]
    async fn list_safelist(&self) -> Result<SafelistResponse, ErrorObjectOwned>;

    /// AWS-CLI parameter documentation (spec §6).
    #[method(name = "help")]
    async fn help(&self, query: Option<String>) -> Result<Vec<HelpEntry>, ErrorObjectOwned>;

    /// Register a target account (goes through chat approval).
    #[method(name = "add_account")]
    async fn add_account(
        &self,
        account_id: String,
        role_arn: Option<String>,
        source: String,
        context: Option<String>,
    ) -> Result<SubmissionResponse, ErrorObjectOwned>;

    /// Remove a target account (goes through chat approval).
    #[method(name = "remove_account")]
    async fn remove_account(&self, account_id: String, source: String, context: Option<String>) -> Result<SubmissionResponse, ErrorObjectOwned>;

    /// List every registered account.
    #[method(name = "list_accounts")]
    async fn list_accounts(&self) -> Result<Vec<AccountInfo>, ErrorObjectOwned>;

    /// Request a batch grant session (spec §4.7).
    #[method(name = "request_grant")]
    async fn request_grant(
        &self,
        commands: Vec<String>,
        reason: String,
        source: String,
        account: Option<String>,
        ttl_minutes: u32,
        allow_repeat: Option<bool>,
    ) -> Result<GrantStatusResponse, ErrorObjectOwned>;

    /// Read a grant session's state; `source` must match its creator.
    #[method(name = "grant_status")]
    async fn grant_status(&self, grant_id: String, source: String) -> Result<GrantStatusResponse, ErrorObjectOwned>;

    /// Revoke an active grant session.
    #[method(name = "revoke_grant")]
    async fn revoke_grant(&self, grant_id: String) -> Result<(), ErrorObjectOwned>;

    /// Read the active trust session for `(source, account)`, if any.
    #[method(name = "trust_status")]
    async fn trust_status(&self, source: String, account: String) -> Result<Option<TrustStatusResponse>, ErrorObjectOwned>;

    /// Revoke a trust session.
    #[method(name = "trust_revoke")]
    async fn trust_revoke(&self, trust_id: String) -> Result<(), ErrorObjectOwned>;

    /// Recent audit rows (spec §6 "Over AuditLog + Requests").
    #[method(name = "history")]
    async fn history(&self, limit: u32) -> Result<Vec<HistoryEntry>, ErrorObjectOwned>;

    /// Aggregate counts over recent audit rows.
    #[method(name = "stats")]
    async fn stats(&self, hours: i64) -> Result<StatsResponse, ErrorObjectOwned>;

    /// Stage a single small-payload upload (goes through chat approval).
    #[method(name = "upload")]
    async fn upload(
        &self,
        filename: String,
        content_type: String,
        content_b64: String,
        reason: String,
        source: String,
        account: Option<String>,
    ) -> Result<SubmissionResponse, ErrorObjectOwned>;

    /// Stage a multi-file batch upload (goes through chat approval).
    #[method(name = "upload_batch")]
    async fn upload_batch(&self, files: Vec<FileUpload>, reason: String, source: String, account: Option<String>) -> Result<SubmissionResponse, ErrorObjectOwned>;

    /// Issue a single presigned PUT URL; no approval required.
    #[method(name = "request_presigned")]
    #[allow(clippy::too_many_arguments)]
    async fn request_presigned(
        &self,
        filename: String,
        content_type: String,
        reason: String,
        source: String,
        account: Option<String>,
        expires_in: i64,
    ) -> Result<PresignedResponse, ErrorObjectOwned>;

    /// Issue presigned PUT URLs for several files; no approval required.
    #[method(name = "request_presigned_batch")]
    #[allow(clippy::too_many_arguments)]
    async fn request_presigned_batch(
        &self,
        files: Vec<FileSpec>,
        reason: String,
        source: String,
        account: Option<String>,
        expires_in: i64,
    ) -> Result<PresignedResponse, ErrorObjectOwned>;

    /// Verify a staged upload against the staging bucket (spec §8 Scenario
    /// F).
    #[method(name = "confirm_upload")]
    async fn confirm_upload(&self, batch_id: String, files: Vec<ConfirmedFile>) -> Result<ConfirmUploadResponse, ErrorObjectOwned>;
}

/// The one stateful implementation of [`BouncerRpcServer`].
#[derive(Clone)]
pub struct RpcImpl {
    ctx: PipelineContext,
}

impl RpcImpl {
    /// Wrap a fully-wired pipeline context.
    #[must_use]
    pub fn new(ctx: PipelineContext) -> Self {
        Self { ctx }
    }
}

fn outcome_to_response(outcome: PipelineOutcome) -> ExecuteResponse {
    match outcome {
        PipelineOutcome::Blocked { request_id, reason } => ExecuteResponse {
            status: DecisionType::Blocked.to_string(),
            request_id,
            exit_code: None,
            result: None,
            reason: Some(reason),
        },
        PipelineOutcome::AutoApproved { request_id, exit_code, result } => ExecuteResponse {
            status: RequestStatus::AutoApproved.to_string(),
            request_id,
            exit_code: Some(exit_code),
            result: Some(result),
            reason: None,
        },
        PipelineOutcome::PendingApproval { request_id } => ExecuteResponse {
            status: DecisionType::PendingApproval.to_string(),
            request_id,
            exit_code: None,
            result: None,
            reason: None,
        },
        PipelineOutcome::Error { request_id, reason } => ExecuteResponse {
            status: DecisionType::Error.to_string(),
            request_id,
            exit_code: None,
            result: None,
            reason: Some(reason),
        },
    }
}

#[jsonrpsee::core::async_trait]
impl BouncerRpcServer for RpcImpl {
    async fn execute(
        &self,
        command: String,
        trust_scope: String,
        reason: String,
        source: Option<String>,
        account: Option<String>,
        context: Option<String>,
        sync: Option<bool>,
        grant_id: Option<String>,
    ) -> Result<ExecuteResponse, ErrorObjectOwned> {
        let input = ExecuteInput {
            command,
            trust_scope: trust_scope.into(),
            reason,
            source,
            account,
            context,
            grant_id,
        };
        let outcome = bouncer_pipeline::submit_execute(&self.ctx, input).await.map_err(ServerError::from)?;
        let mut response = outcome_to_response(outcome);

        if sync == Some(true) && response.status == DecisionType::PendingApproval.to_string() {
            response = self.wait_for_terminal(response).await?;
        }
        Ok(response)
    }

    async fn status(&self, request_id: String) -> Result<StatusResponse, ErrorObjectOwned> {
        let request = self
            .ctx
            .store
            .requests()
            .get(&request_id)
            .await
            .map_err(ServerError::from)?
            .ok_or_else(|| ServerError::NotFound(format!("request {request_id}")))?;
        Ok(request.into())
    }

    async fn get_page(&self, page_id: String) -> Result<PageResponse, ErrorObjectOwned> {
        let (request_id, page) = parse_page_id(&page_id).map_err(ServerError::Validation)?;
        let page = self
            .ctx
            .store
            .output_pages()
            .get_page(&request_id, page)
            .await
            .map_err(ServerError::from)?
            .ok_or_else(|| ServerError::NotFound(format!("page {page_id}")))?;
        Ok(page.into())
    }

    async fn list_pending(&self, source: Option<String>, limit: u32) -> Result<Vec<PendingEntry>, ErrorObjectOwned> {
        let requests = self.ctx.store.requests().list_pending(source.as_deref(), limit).await.map_err(ServerError::from)?;
        Ok(requests.into_iter().map(Into::into).collect())
    }

    async fn list_safelist(&self) -> Result<SafelistResponse, ErrorObjectOwned> {
        Ok(SafelistResponse {
            safelist_prefixes: self.ctx.classifier.safelist_prefixes.clone(),
            blocked_patterns: self.ctx.classifier.blocked_patterns.clone(),
            dangerous_patterns: self.ctx.classifier.dangerous_patterns.clone(),
        })
    }

    async fn help(&self, query: Option<String>) -> Result<Vec<HelpEntry>, ErrorObjectOwned> {
        Ok(help::lookup(query.as_deref()))
    }

    async fn add_account(
        &self,
        account_id: String,
        role_arn: Option<String>,
        source: String,
        context: Option<String>,
    ) -> Result<SubmissionResponse, ErrorObjectOwned> {
        let reason = context.unwrap_or_else(|| "add_account".to_owned());
        let request_id = bouncer_pipeline::submit_account_action(
            &self.ctx,
            AccountActionInput {
                action: Action::AddAccount,
                source,
                account_id,
                role_arn,
                reason,
            },
        )
        .await
        .map_err(ServerError::from)?;
        Ok(SubmissionResponse {
            status: DecisionType::PendingApproval.to_string(),
            request_id,
        })
    }

    async fn remove_account(&self, account_id: String, source: String, context: Option<String>) -> Result<SubmissionResponse, ErrorObjectOwned> {
        let reason = context.unwrap_or_else(|| "remove_account".to_owned());
        let request_id = bouncer_pipeline::submit_account_action(
            &self.ctx,
            AccountActionInput {
                action: Action::RemoveAccount,
                source,
                account_id,
                role_arn: None,
                reason,
            },
        )
        .await
        .map_err(ServerError::from)?;
        Ok(SubmissionResponse {
            status: DecisionType::PendingApproval.to_string(),
            request_id,
        })
    }

    async fn list_accounts(&self) -> Result<Vec<AccountInfo>, ErrorObjectOwned> {
        let accounts = self.ctx.store.accounts().list().await.map_err(ServerError::from)?;
        Ok(accounts.into_iter().map(Into::into).collect())
    }

    async fn request_grant(
        &self,
        commands: Vec<String>,
        reason: String,
        source: String,
        account: Option<String>,
        ttl_minutes: u32,
        allow_repeat: Option<bool>,
    ) -> Result<GrantStatusResponse, ErrorObjectOwned> {
        if commands.is_empty() || commands.len() > bouncer_grant::MAX_GRANT_COMMANDS {
            return Err(ServerError::Validation(format!("commands must be 1..={}", bouncer_grant::MAX_GRANT_COMMANDS)).into());
        }
        let account_id = self.resolve_account_id(account).await?;
        let session = bouncer_pipeline::submit_grant_request(
            &self.ctx,
            GrantRequestInput {
                source,
                account_id,
                commands,
                reason,
                ttl_minutes,
                max_total_executions: u32::MAX,
                allow_repeat: allow_repeat.unwrap_or(false),
            },
        )
        .await
        .map_err(ServerError::from)?;
        Ok(session.into())
    }

    async fn grant_status(&self, grant_id: String, source: String) -> Result<GrantStatusResponse, ErrorObjectOwned> {
        let session = self
            .ctx
            .store
            .grant_sessions()
            .get(&grant_id)
            .await
            .map_err(ServerError::from)?
            .ok_or_else(|| ServerError::NotFound(format!("grant {grant_id}")))?;
        if session.source != source {
            return Err(ServerError::Forbidden("source does not match grant creator".to_owned()).into());
        }
        Ok(session.into())
    }

    async fn revoke_grant(&self, grant_id: String) -> Result<(), ErrorObjectOwned> {
        let revoked = bouncer_grant::revoke_grant(&self.ctx.store, &grant_id).await.map_err(ServerError::from)?;
        if !revoked {
            return Err(ServerError::NotFound(format!("grant {grant_id}")).into());
        }
        Ok(())
    }

    async fn trust_status(&self, source: String, account: String) -> Result<Option<TrustStatusResponse>, ErrorObjectOwned> {
        let session = bouncer_trust::get_trust(&self.ctx.store, &source, &account).await.map_err(ServerError::from)?;
        Ok(session.map(Into::into))
    }

    async fn trust_revoke(&self, trust_id: String) -> Result<(), ErrorObjectOwned> {
        bouncer_trust::revoke_trust_session(&self.ctx.store, &trust_id).await.map_err(ServerError::from)?;
        Ok(())
    }

    async fn history(&self, limit: u32) -> Result<Vec<HistoryEntry>, ErrorObjectOwned> {
        let entries = self.ctx.store.audit_log().recent(limit).await.map_err(ServerError::from)?;
        Ok(entries.into_iter().map(Into::into).collect())
    }

    async fn stats(&self, hours: i64) -> Result<StatsResponse, ErrorObjectOwned> {
        let window_secs = hours.max(1).saturating_mul(3600);
        let cutoff = bouncer_core::Timestamp::now().plus_seconds(-window_secs);
        let entries = self.ctx.store.audit_log().recent(10_000).await.map_err(ServerError::from)?;
        let mut stats = StatsResponse {
            hours,
            ..StatsResponse::default()
        };
        for entry in entries.into_iter().filter(|e| e.created_at.unix_timestamp() >= cutoff.unix_timestamp()) {
            stats.total_events = stats.total_events.saturating_add(1);
            let counter = stats.by_action.entry(entry.action).or_insert(0);
            *counter = counter.saturating_add(1);
        }
        Ok(stats)
    }

    async fn upload(
        &self,
        filename: String,
        content_type: String,
        content_b64: String,
        reason: String,
        source: String,
        account: Option<String>,
    ) -> Result<SubmissionResponse, ErrorObjectOwned> {
        let files = bouncer_pipeline::prepare_upload_files(&[UploadFileInput { filename, content_type, content_b64 }]).map_err(ServerError::from)?;
        let request_id = bouncer_pipeline::submit_upload_action(&self.ctx, Action::Upload, source, account, reason, files).await.map_err(ServerError::from)?;
        Ok(SubmissionResponse {
            status: DecisionType::PendingApproval.to_string(),
            request_id,
        })
    }

    async fn upload_batch(&self, files: Vec<FileUpload>, reason: String, source: String, account: Option<String>) -> Result<SubmissionResponse, ErrorObjectOwned> {
        let inputs = files
            .into_iter()
            .map(|f| UploadFileInput {
                filename: f.filename,
                content_type: f.content_type,
                content_b64: f.content_b64,
            })
            .collect::<Vec<_>>();
        let prepared = bouncer_pipeline::prepare_upload_files(&inputs).map_err(ServerError::from)?;
        let request_id = bouncer_pipeline::submit_upload_action(&self.ctx, Action::UploadBatch, source, account, reason, prepared).await.map_err(ServerError::from)?;
        Ok(SubmissionResponse {
            status: DecisionType::PendingApproval.to_string(),
            request_id,
        })
    }

    async fn request_presigned(
        &self,
        filename: String,
        content_type: String,
        reason: String,
        source: String,
        account: Option<String>,
        expires_in: i64,
    ) -> Result<PresignedResponse, ErrorObjectOwned> {
        let files = vec![PresignedFileRequest { filename, content_type }];
        presigned::request_presigned(&self.ctx.store, source, account, reason, files, expires_in).await.map_err(Into::into)
    }

    async fn request_presigned_batch(
        &self,
        files: Vec<FileSpec>,
        reason: String,
        source: String,
        account: Option<String>,
        expires_in: i64,
    ) -> Result<PresignedResponse, ErrorObjectOwned> {
        let files = files.into_iter().map(|f| PresignedFileRequest { filename: f.filename, content_type: f.content_type }).collect();
        presigned::request_presigned(&self.ctx.store, source, account, reason, files, expires_in).await.map_err(Into::into)
    }

    async fn confirm_upload(&self, batch_id: String, files: Vec<ConfirmedFile>) -> Result<ConfirmUploadResponse, ErrorObjectOwned> {
        let keys = files.into_iter().map(|f| f.s3_key).collect::<Vec<_>>();
        presigned::confirm_upload(&self.ctx.store, &batch_id, &keys).await.map_err(Into::into)
    }
}

impl RpcImpl {
    async fn resolve_account_id(&self, account: Option<String>) -> Result<AccountId, ErrorObjectOwned> {
        let found = match account.as_deref() {
            Some(id) => self.ctx.store.accounts().get(id).await.map_err(ServerError::from)?,
            None => self.ctx.store.accounts().default_account().await.map_err(ServerError::from)?,
        };
        found
            .map(|a| a.account_id)
            .ok_or_else(|| ServerError::Validation("no usable target account".to_owned()).into())
    }

    /// Poll `status` at 250-ms intervals until the request leaves
    /// `pending_approval` or `expires_at` elapses (spec §5).
    async fn wait_for_terminal(&self, mut response: ExecuteResponse) -> Result<ExecuteResponse, ErrorObjectOwned> {
        loop {
            let request = self
                .ctx
                .store
                .requests()
                .get(&response.request_id)
                .await
                .map_err(ServerError::from)?
                .ok_or_else(|| ServerError::NotFound(format!("request {}", response.request_id)))?;
            if request.status != RequestStatus::PendingApproval {
                return Ok(ExecuteResponse {
                    status: request.status.to_string(),
                    request_id: request.request_id.to_string(),
                    exit_code: request.exit_code,
                    result: request.result,
                    reason: None,
                });
            }
            if request.is_overdue() {
                response.status = DecisionType::Timeout.to_string();
                return Ok(response);
            }
            tokio::time::sleep(SYNC_POLL_INTERVAL).await;
        }
    }
}

fn parse_page_id(page_id: &str) -> Result<(String, u32), String> {
    let mut parts = page_id.splitn(3, ':');
    let request_id = parts.next().ok_or_else(|| "malformed page_id".to_owned())?;
    let marker = parts.next().ok_or_else(|| "malformed page_id".to_owned())?;
    let page = parts.next().ok_or_else(|| "malformed page_id".to_owned())?;
    if marker != "page" {
        return Err("malformed page_id".to_owned());
    }
    let page = page.parse::<u32>().map_err(|_| "malformed page_id".to_owned())?;
    Ok((request_id.to_owned(), page))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_page_id_accepts_the_request_page_marker_page_shape() {
        assert_eq!(parse_page_id("req-123:page:2").unwrap(), ("req-123".to_owned(), 2));
    }

    #[test]
    fn parse_page_id_rejects_a_missing_marker() {
        assert!(parse_page_id("req-123:2").is_err());
    }

    #[test]
    fn parse_page_id_rejects_a_non_numeric_page() {
        assert!(parse_page_id("req-123:page:abc").is_err());
    }

    #[test]
    fn parse_page_id_rejects_the_wrong_marker() {
        assert!(parse_page_id("req-123:chunk:2").is_err());
    }

    #[test]
    fn outcome_to_response_maps_blocked() {
        let response = outcome_to_response(PipelineOutcome::Blocked {
            request_id: "r1".to_owned(),
            reason: "compliance violation".to_owned(),
        });
        assert_eq!(response.status, DecisionType::Blocked.to_string());
        assert_eq!(response.reason.as_deref(), Some("compliance violation"));
        assert!(response.exit_code.is_none());
    }

    #[test]
    fn outcome_to_response_maps_auto_approved() {
        let response = outcome_to_response(PipelineOutcome::AutoApproved {
            request_id: "r2".to_owned(),
            exit_code: 0,
            result: "ok".to_owned(),
        });
        assert_eq!(response.status, RequestStatus::AutoApproved.to_string());
        assert_eq!(response.exit_code, Some(0));
        assert_eq!(response.result.as_deref(), Some("ok"));
    }

    #[test]
    fn outcome_to_response_maps_pending_approval() {
        let response = outcome_to_response(PipelineOutcome::PendingApproval { request_id: "r3".to_owned() });
        assert_eq!(response.status, DecisionType::PendingApproval.to_string());
        assert!(response.reason.is_none());
    }

    #[test]
    fn outcome_to_response_maps_error() {
        let response = outcome_to_response(PipelineOutcome::Error {
            request_id: "r4".to_owned(),
            reason: "notify failed".to_owned(),
        });
        assert_eq!(response.status, DecisionType::Error.to_string());
        assert_eq!(response.reason.as_deref(), Some("notify failed"));
    }
}
