//! `request_presigned`/`request_presigned_batch`/`confirm_upload` (spec §6:
//! "No approval — issues PUT URLs for staging bucket"; §8 Scenario F).
//!
//! Bouncer only exposes the `deploy` action slot for the real
//! build-and-deploy orchestrator; the staging bucket itself is synthetic
//! here (no AWS SDK call), so the "presigned URL" is a deterministic,
//! HMAC-free construction over the batch id and file key. This is enough
//! to exercise the verification contract `confirm_upload` promises without
//! pulling in real S3 credentials.

use bouncer_core::{AccountId, BatchId, PresignedFile, Timestamp, UploadBatch};
use bouncer_store::Store;
use sha2::{Digest, Sha256};

use crate::error::{ServerError, ServerResult};
use crate::wire::{ConfirmUploadResponse, PresignedFileResponse, PresignedResponse};

const STAGING_BUCKET: &str = "bouncer-staging";
const MIN_EXPIRES_IN: i64 = 60;
const MAX_EXPIRES_IN: i64 = 3600;

/// One `(filename, content_type)` pair requested by the caller.
#[derive(Debug, Clone)]
pub struct PresignedFileRequest {
    /// Caller-supplied filename.
    pub filename: String,
    /// `Content-Type` to sign the URL against.
    pub content_type: String,
}

fn object_key(batch_id: &str, filename: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(batch_id.as_bytes());
    hasher.update(b"\0");
    hasher.update(filename.as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("uploads/{}/{filename}", &digest[..16])
}

fn put_url(s3_key: &str, content_type: &str, expires_at: Timestamp) -> String {
    format!(
        "https://{STAGING_BUCKET}.s3.amazonaws.com/{s3_key}?X-Amz-Expires={}&X-Amz-SignedHeaders=content-type&content-type={}",
        expires_at.unix_timestamp(),
        urlencode(content_type),
    )
}

fn urlencode(value: &str) -> String {
    value.replace(' ', "%20").replace('/', "%2F")
}

/// Issue presigned PUT URLs for one or more files and persist the expected
/// key list (spec §3 "Staging bucket").
pub async fn request_presigned(
    store: &Store,
    source: String,
    account_id: Option<String>,
    reason: String,
    files: Vec<PresignedFileRequest>,
    expires_in: i64,
) -> ServerResult<PresignedResponse> {
    if files.is_empty() {
        return Err(ServerError::Validation("at least one file is required".to_owned()));
    }
    let expires_in = expires_in.clamp(MIN_EXPIRES_IN, MAX_EXPIRES_IN);

    let now = Timestamp::now();
    let expires_at = now.plus_seconds(expires_in);
    let batch_id = BatchId::new();

    let presigned_files = files
        .into_iter()
        .map(|file| {
            let s3_key = object_key(&batch_id.0, &file.filename);
            let put_url = put_url(&s3_key, &file.content_type, expires_at);
            PresignedFile {
                filename: file.filename,
                s3_key,
                content_type: file.content_type,
                put_url,
            }
        })
        .collect::<Vec<_>>();

    let batch = UploadBatch {
        batch_id: batch_id.clone(),
        source,
        account_id: account_id.map(AccountId::from),
        reason,
        files: presigned_files.clone(),
        created_at: now,
        expires_at,
        verified: None,
        missing: Vec::new(),
        confirmed_at: None,
        ttl: expires_at.plus_seconds(MAX_EXPIRES_IN),
    };
    store.upload_batches().put(&batch).await?;

    Ok(PresignedResponse {
        batch_id: batch_id.to_string(),
        files: presigned_files
            .into_iter()
            .map(|f| PresignedFileResponse {
                filename: f.filename,
                s3_key: f.s3_key,
                put_url: f.put_url,
            })
            .collect(),
        expires_at: expires_at.to_string(),
    })
}

/// Verify a caller-reported upload against the batch's expected keys
/// (spec §8 Scenario F: "one key missing → verified=false, missing=[that
/// one key]").
pub async fn confirm_upload(store: &Store, batch_id: &str, confirmed_keys: &[String]) -> ServerResult<ConfirmUploadResponse> {
    let Some(batch) = store.upload_batches().get(batch_id).await? else {
        return Err(ServerError::NotFound(format!("upload batch {batch_id}")));
    };

    let missing = batch
        .files
        .iter()
        .map(|file| file.s3_key.clone())
        .filter(|key| !confirmed_keys.contains(key))
        .collect::<Vec<_>>();
    let verified = missing.is_empty();

    let now = Timestamp::now();
    store.upload_batches().record_confirmation(batch_id, verified, &missing, now, now.plus_seconds(MAX_EXPIRES_IN)).await?;

    Ok(ConfirmUploadResponse {
        batch_id: batch_id.to_owned(),
        verified,
        missing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_key_is_deterministic_per_batch_and_filename() {
        let a = object_key("batch_a", "photo.png");
        let b = object_key("batch_a", "photo.png");
        let c = object_key("batch_a", "other.png");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn expires_in_clamped_to_bounds() {
        assert_eq!(10i64.clamp(MIN_EXPIRES_IN, MAX_EXPIRES_IN), MIN_EXPIRES_IN);
        assert_eq!(99_999i64.clamp(MIN_EXPIRES_IN, MAX_EXPIRES_IN), MAX_EXPIRES_IN);
    }
}
