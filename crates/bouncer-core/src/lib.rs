//! Shared types for the Bouncer authorization broker.
//!
//! This crate has no dependencies on other internal Bouncer crates: it only
//! depends on `serde`, `chrono`, `uuid`, and `thiserror`. Every other crate
//! in the workspace builds on the identifiers, timestamp wrapper, and
//! request/session data model defined here.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

/// Request, trust-session, grant-session and audit identifiers.
pub mod ids;
/// The `Request` row and its status automaton.
pub mod request;
/// `TrustSession`, `GrantSession`, `AuditLog`, `OutputPage`, `Account` rows.
pub mod session;
/// Wall-clock timestamp newtype.
pub mod time;

pub use ids::{AccountId, BatchId, GrantId, RequestId, TrustId, TrustScope};
pub use request::{Action, DecisionType, Request, RequestStatus, RiskCategory, RiskFactor};
pub use session::{
    Account, AuditLogEntry, GrantApprovalMode, GrantCommandCategory, GrantCommandDetail, GrantSession, GrantStatus, OutputPage,
    PresignedFile, TrustSession, UploadBatch,
};
pub use time::Timestamp;
