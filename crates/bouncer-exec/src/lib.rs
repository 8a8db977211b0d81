//! Executor (C9, spec §4.9).
//!
//! Credential isolation is the invariant: the subprocess environment is a
//! brand-new owned map built fresh per call, never a mutation of the
//! broker's own `std::env` (spec §9 "Global mutable state (credential
//! env)"). Two concurrent executions can never observe each other's
//! credentials because neither touches shared process state.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod credentials;
mod env;
mod executor;

pub use credentials::{AssumeRoleError, RoleAssumer, TemporaryCredentials};
pub use env::build_environment;
pub use executor::{execute, ExecError, ExecOutput, ExecRequest, ExecResult, DEFAULT_TIMEOUT, NO_OUTPUT_MARKER};

/// Tokenize a command and run it (spec §4.1 "this tokenizer is the sole
/// input to the executor"). A thin convenience wrapper over
/// [`execute`]/[`bouncer_classifier::tokenize`] for callers that still hold
/// the raw command string.
pub async fn execute_command(
    cmd: &str,
    assume_role_arn: Option<&str>,
    timeout: std::time::Duration,
    ambient: &std::collections::HashMap<String, String>,
    role_assumer: Option<&dyn RoleAssumer>,
) -> ExecResult<ExecOutput> {
    let argv = bouncer_classifier::tokenize(cmd);
    let request = ExecRequest {
        argv: &argv,
        assume_role_arn,
        timeout,
    };
    execute(&request, ambient, role_assumer).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn execute_command_tokenizes_before_spawning() {
        let result = execute_command("echo hello", None, DEFAULT_TIMEOUT, &std::collections::HashMap::new(), None)
            .await
            .unwrap();
        assert_eq!(result.exit_code, 0);
        assert!(result.output.contains("hello"));
    }
}
