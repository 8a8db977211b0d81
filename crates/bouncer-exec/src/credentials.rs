use async_trait::async_trait;
use thiserror::Error;

/// Temporary credentials for an assumed role (spec §4.9).
#[derive(Clone)]
pub struct TemporaryCredentials {
    /// `AWS_ACCESS_KEY_ID` value.
    pub access_key_id: String,
    /// `AWS_SECRET_ACCESS_KEY` value.
    pub secret_access_key: String,
    /// `AWS_SESSION_TOKEN` value.
    pub session_token: String,
}

impl std::fmt::Debug for TemporaryCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemporaryCredentials").finish_non_exhaustive()
    }
}

/// Errors obtaining temporary credentials for a role.
#[derive(Debug, Error)]
pub enum AssumeRoleError {
    /// The STS/IAM call or equivalent failed.
    #[error("failed to assume role {role_arn}: {reason}")]
    Failed {
        /// The role that could not be assumed.
        role_arn: String,
        /// Underlying provider error text.
        reason: String,
    },
}

/// Obtains temporary credentials for a role ARN. Implemented outside this
/// crate against the target cloud provider's STS-equivalent API, so the
/// executor itself never depends on a specific provider SDK (spec §4.9
/// scopes the executor to the isolation invariant, not credential
/// acquisition).
#[async_trait]
pub trait RoleAssumer: Send + Sync {
    /// Assume `role_arn`, returning freshly issued temporary credentials.
    async fn assume_role(&self, role_arn: &str) -> Result<TemporaryCredentials, AssumeRoleError>;
}
