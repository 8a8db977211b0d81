//! Execution Pipeline (C8) and Callback Handler (C10).
//!
//! Orchestrates every other crate in the workspace: classifier, compliance,
//! risk scoring, grants, trust sessions and the executor feed into
//! [`execute::submit_execute`], and resolved inline-button presses feed into
//! [`callback::CallbackHandler`].

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod account;
mod audit;
mod callback;
mod config;
mod error;
mod execute;
mod grant;
mod rate_limit;
mod render;
mod upload;

pub use account::{submit_account_action, AccountActionInput};
pub use callback::CallbackHandler;
pub use config::{PipelineContext, RateLimitConfig};
pub use error::{PipelineError, PipelineResult};
pub use execute::{submit_execute, ExecuteInput, PipelineOutcome};
pub use grant::{submit_grant_request, GrantRequestInput};
pub use rate_limit::RateLimitOutcome;
pub use upload::{prepare as prepare_upload_files, submit_upload_action, UploadFileInput, UploadFileMeta};
