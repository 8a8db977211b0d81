//! `upload`/`upload_batch` submission (spec §6 "small-payload path; routes
//! through same approval pipeline"): unlike `request_presigned`, these carry
//! the file content inline (base64) and need an approver's sign-off before
//! the synthetic staging write happens in
//! [`crate::callback::finalize_upload`].

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bouncer_core::{Action, Request, RequestId, RequestStatus, Timestamp};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::audit;
use crate::config::PipelineContext;
use crate::error::{PipelineError, PipelineResult};

/// One file within an `upload`/`upload_batch` call.
#[derive(Debug, Clone)]
pub struct UploadFileInput {
    /// Caller-supplied filename.
    pub filename: String,
    /// MIME type of the payload.
    pub content_type: String,
    /// Base64-encoded content.
    pub content_b64: String,
}

/// Per-file metadata persisted on the request once content is hashed,
/// serialized into `Request::context` the same way `add_account` reuses it
/// for a role ARN.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadFileMeta {
    /// Caller-supplied filename.
    pub filename: String,
    /// MIME type of the payload.
    pub content_type: String,
    /// Payload size in bytes.
    pub size_bytes: u64,
    /// Hex-encoded SHA-256 of the decoded payload.
    pub sha256: String,
}

/// Decode and hash every file; rejects malformed base64 before any row is
/// created.
pub fn prepare(files: &[UploadFileInput]) -> PipelineResult<Vec<UploadFileMeta>> {
    if files.is_empty() {
        return Err(PipelineError::Validation("at least one file is required".to_owned()));
    }
    files
        .iter()
        .map(|file| {
            let bytes = BASE64
                .decode(&file.content_b64)
                .map_err(|error| PipelineError::Validation(format!("{}: invalid base64 ({error})", file.filename)))?;
            let mut hasher = Sha256::new();
            hasher.update(&bytes);
            Ok(UploadFileMeta {
                filename: file.filename.clone(),
                content_type: file.content_type.clone(),
                size_bytes: bytes.len() as u64,
                sha256: hex::encode(hasher.finalize()),
            })
        })
        .collect()
}

/// Create the pending request and post the approval prompt (spec §4.8
/// step 10's shape, minus risk scoring: uploads are classified solely by
/// the approver's judgment).
pub async fn submit_upload_action(
    ctx: &PipelineContext,
    action: Action,
    source: String,
    account_id: Option<String>,
    reason: String,
    files: Vec<UploadFileMeta>,
) -> PipelineResult<String> {
    let now = Timestamp::now();
    let context = serde_json::to_string(&files).map_err(|error| PipelineError::Validation(error.to_string()))?;

    let mut request = Request {
        request_id: RequestId::new(),
        source: Some(source),
        account_id: account_id.map(Into::into),
        command: String::new(),
        reason,
        context: Some(context),
        action,
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

    ctx.store.requests().put(&request).await?;

    let names = files.iter().map(|file| file.filename.as_str()).collect::<Vec<_>>().join(", ");
    let prompt = format!("<b>Upload requested</b>\nFiles: {}\nReason: {}", html_escape(&names), html_escape(&request.reason));
    let keyboard = bouncer_chat::approval_keyboard(&request.request_id.to_string(), true);

    match ctx.chat.send(ctx.chat_id, &prompt, Some(keyboard)).await {
        Ok(message_id) => {
            request.chat_message_id = Some(message_id.0.to_string());
            ctx.store.requests().put_overwrite(&request).await?;
            audit::append(ctx, &request, "system", "pending_approval", serde_json::json!({})).await;
        }
        Err(error) => {
            warn!(%error, request_id = %request.request_id, "failed to send upload approval prompt");
            request.status = RequestStatus::Error;
            request.decided_at = Some(Timestamp::now());
            ctx.store.requests().put_overwrite(&request).await?;
            audit::append(ctx, &request, "system", "error", serde_json::json!({"error": error.to_string()})).await;
        }
    }

    Ok(request.request_id.to_string())
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepare_rejects_an_empty_file_list() {
        assert!(prepare(&[]).is_err());
    }

    #[test]
    fn prepare_hashes_and_sizes_valid_content() {
        let files = vec![UploadFileInput {
            filename: "report.txt".to_owned(),
            content_type: "text/plain".to_owned(),
            content_b64: BASE64.encode(b"hello world"),
        }];
        let meta = prepare(&files).unwrap();
        assert_eq!(meta.len(), 1);
        assert_eq!(meta[0].filename, "report.txt");
        assert_eq!(meta[0].size_bytes, 11);
        assert_eq!(meta[0].sha256, "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9");
    }

    #[test]
    fn prepare_rejects_invalid_base64() {
        let files = vec![UploadFileInput {
            filename: "bad.bin".to_owned(),
            content_type: "application/octet-stream".to_owned(),
            content_b64: "not-valid-base64!!".to_owned(),
        }];
        assert!(prepare(&files).is_err());
    }
}
