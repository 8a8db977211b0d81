use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 12 hex-char request identifier (spec §3: "12 hex chars, unique").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    /// Generate a new random request id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The 12 hex-character form used as the store key.
    #[must_use]
    pub fn as_hex12(&self) -> String {
        self.0.simple().to_string()[..12].to_owned()
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_hex12())
    }
}

/// Deterministic trust-session identifier, hashed from `(trust_scope, account)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrustId(pub String);

impl TrustId {
    /// `trust_id = deterministic_hash(trust_scope, account)` (spec §3/§4.6).
    ///
    /// Uses UUID v5 (name-based, SHA-1) over the namespace `(trust_scope,
    /// account)` tuple so the same pair always resolves to the same row.
    #[must_use]
    pub fn derive(trust_scope: &str, account_id: &str) -> Self {
        let name = format!("{trust_scope}\0{account_id}");
        let uuid = Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes());
        Self(format!("trust-{}", uuid.simple()))
    }
}

impl fmt::Display for TrustId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Random 32-hex grant-session identifier (spec §3).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GrantId(pub String);

impl GrantId {
    /// Generate a new random grant id.
    #[must_use]
    pub fn new() -> Self {
        Self(format!("grant_{}", Uuid::new_v4().simple()))
    }
}

impl Default for GrantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GrantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The agent-supplied `trust_scope` (spec §4.1 step 1, §9 "trust scope
/// semantics"). Kept unified with the `source` store key rather than a
/// separate authentication identity — see `TrustId::derive`, which hashes
/// this value directly. A distinct newtype exists so call sites read as
/// "this is the trust-grouping key", even though the wire representation is
/// the same string as `source`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrustScope(pub String);

impl TrustScope {
    /// Borrow the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrustScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TrustScope {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TrustScope {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Random 32-hex presigned-upload batch identifier (spec §6 `request_presigned_batch`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchId(pub String);

impl BatchId {
    /// Generate a new random batch id.
    #[must_use]
    pub fn new() -> Self {
        Self(format!("batch_{}", Uuid::new_v4().simple()))
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A 12-digit target cloud account identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(pub String);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for AccountId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_id_hex12_len() {
        let id = RequestId::new();
        assert_eq!(id.as_hex12().len(), 12);
    }

    #[test]
    fn trust_id_deterministic() {
        let a = TrustId::derive("agent-1", "111111111111");
        let b = TrustId::derive("agent-1", "111111111111");
        assert_eq!(a, b);
    }

    #[test]
    fn trust_id_distinguishes_scope() {
        let a = TrustId::derive("agent-1", "111111111111");
        let b = TrustId::derive("agent-2", "111111111111");
        assert_ne!(a, b);
    }

    #[test]
    fn grant_id_has_prefix() {
        let id = GrantId::new();
        assert!(id.0.starts_with("grant_"));
    }
}
