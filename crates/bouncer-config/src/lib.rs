//! Layered configuration for the Bouncer broker.
//!
//! A single [`BouncerConfig`] consolidates every external table spec §6
//! names as configuration: classifier safelist/blocked/dangerous patterns,
//! the compliance rule table, risk-scorer weights, trust-exclusion tables,
//! rate-limit settings, the chat approver set, and RPC server settings.
//!
//! # Precedence
//!
//! Highest to lowest:
//! 1. Workspace (`{workspace}/bouncer.toml`)
//! 2. User (`~/.bouncer/config.toml`)
//! 3. Environment variables (`BOUNCER_*`) — fallback only
//! 4. Embedded defaults (`defaults.toml`, compiled into the binary)
//!
//! # Design
//!
//! This crate has no dependency on any other internal Bouncer crate.
//! Domain tables (`ClassifierTables`, `ComplianceRule`, `RiskTables`,
//! `TrustExclusionTables`, ...) are mirrored here as plain data and
//! converted to their live counterparts at the integration boundary
//! (`bouncer-cli`'s bridge module), matching `astrid-config`'s separation
//! between config types and the domain types they configure.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod env;
mod error;
mod loader;
mod merge;
mod types;
mod validate;

pub use error::{ConfigError, ConfigResult};
pub use types::*;

impl BouncerConfig {
    /// Load configuration with the full precedence chain.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any config file is malformed or the
    /// final configuration fails validation.
    pub fn load(workspace_root: Option<&std::path::Path>) -> ConfigResult<Self> {
        loader::load(workspace_root)
    }

    /// Load configuration with an explicit home-directory override (tests,
    /// alternate deployment layouts).
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any config file is malformed or the
    /// final configuration fails validation.
    pub fn load_with_home(workspace_root: Option<&std::path::Path>, home_dir: &std::path::Path) -> ConfigResult<Self> {
        loader::load_with_home(workspace_root, Some(home_dir))
    }

    /// Load configuration from a single file, with no layering.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read, parsed, or
    /// fails validation.
    pub fn load_file(path: &std::path::Path) -> ConfigResult<Self> {
        loader::load_file(path)
    }
}
