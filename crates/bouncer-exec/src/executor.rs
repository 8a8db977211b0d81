use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;

use crate::credentials::{AssumeRoleError, RoleAssumer};
use crate::env::build_environment;

/// Shown in place of genuinely empty stdout/stderr on a successful run
/// (spec §4.9 "Normalize 'no output on success' to a canned string").
pub const NO_OUTPUT_MARKER: &str = "(command completed with no output)";

/// Default per-call timeout (spec §4.9 "e.g. 25 s").
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(25);

/// Result of one executor invocation.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    /// Process exit code, or `-1` if the process was killed on timeout.
    pub exit_code: i32,
    /// Combined stdout + stderr.
    pub output: String,
    /// True if the call was terminated by the timeout rather than exiting on its own.
    pub timed_out: bool,
}

/// Errors raised by the executor itself (distinct from a non-zero exit
/// code, which is a normal [`ExecOutput`]).
#[derive(Debug, Error)]
pub enum ExecError {
    /// Temporary credentials could not be obtained for `assume_role_arn`.
    #[error(transparent)]
    AssumeRole(#[from] AssumeRoleError),
    /// The subprocess could not be spawned at all.
    #[error("failed to spawn command: {0}")]
    Spawn(#[source] std::io::Error),
    /// `assume_role_arn` was set but no [`RoleAssumer`] was configured.
    #[error("assume_role_arn {0} requested but no role assumer is configured")]
    NoRoleAssumer(String),
}

/// Convenience alias.
pub type ExecResult<T> = Result<T, ExecError>;

/// One command invocation (spec §4.9 "Inputs").
pub struct ExecRequest<'a> {
    /// Tokenized argv, never a shell string (spec §4.1 "sole input to the executor").
    pub argv: &'a [String],
    /// Role to assume, if the target account is not the broker's own account.
    pub assume_role_arn: Option<&'a str>,
    /// Per-call timeout; defaults to [`DEFAULT_TIMEOUT`].
    pub timeout: Duration,
}

/// Run one command under credential isolation (spec §4.9). `ambient` is the
/// process's own environment, snapshotted once by the caller so a shared
/// `std::env` read never races a concurrent invocation's env construction.
pub async fn execute(request: &ExecRequest<'_>, ambient: &HashMap<String, String>, role_assumer: Option<&dyn RoleAssumer>) -> ExecResult<ExecOutput> {
    let Some((program, rest)) = request.argv.split_first() else {
        return Ok(ExecOutput {
            exit_code: -1,
            output: "no command provided".to_owned(),
            timed_out: false,
        });
    };

    let creds = match (request.assume_role_arn, role_assumer) {
        (Some(role_arn), Some(assumer)) => Some(assumer.assume_role(role_arn).await?),
        (Some(role_arn), None) => return Err(ExecError::NoRoleAssumer(role_arn.to_owned())),
        (None, _) => None,
    };
    let env = build_environment(ambient, creds.as_ref());

    let mut command = Command::new(program);
    command.args(rest);
    command.env_clear();
    command.envs(&env);
    command.kill_on_drop(true);

    let spawn_result = tokio::time::timeout(request.timeout, command.output()).await;

    match spawn_result {
        Ok(Ok(output)) => {
            let exit_code = output.status.code().unwrap_or(-1);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            let combined = combine(&stdout, &stderr, exit_code);
            Ok(ExecOutput {
                exit_code,
                output: combined,
                timed_out: false,
            })
        }
        Ok(Err(error)) => Err(ExecError::Spawn(error)),
        Err(_elapsed) => Ok(ExecOutput {
            exit_code: -1,
            output: format!("command timed out after {}s", request.timeout.as_secs()),
            timed_out: true,
        }),
    }
}

fn combine(stdout: &str, stderr: &str, exit_code: i32) -> String {
    let mut text = String::new();
    if !stdout.trim().is_empty() {
        text.push_str(stdout.trim_end());
    }
    if !stderr.trim().is_empty() {
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str("STDERR:\n");
        text.push_str(stderr.trim_end());
    }
    if text.is_empty() {
        if exit_code == 0 {
            return NO_OUTPUT_MARKER.to_owned();
        }
        text.push_str("(no output)");
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn successful_echo_is_captured() {
        let request = ExecRequest {
            argv: &["echo".to_owned(), "hello".to_owned()],
            assume_role_arn: None,
            timeout: DEFAULT_TIMEOUT,
        };
        let result = execute(&request, &HashMap::new(), None).await.unwrap();
        assert_eq!(result.exit_code, 0);
        assert!(result.output.contains("hello"));
    }

    #[tokio::test]
    async fn no_output_on_success_is_normalized() {
        let request = ExecRequest {
            argv: &["true".to_owned()],
            assume_role_arn: None,
            timeout: DEFAULT_TIMEOUT,
        };
        let result = execute(&request, &HashMap::new(), None).await.unwrap();
        assert_eq!(result.output, NO_OUTPUT_MARKER);
    }

    #[tokio::test]
    async fn nonzero_exit_is_preserved() {
        let request = ExecRequest {
            argv: &["sh".to_owned(), "-c".to_owned(), "exit 7".to_owned()],
            assume_role_arn: None,
            timeout: DEFAULT_TIMEOUT,
        };
        let result = execute(&request, &HashMap::new(), None).await.unwrap();
        assert_eq!(result.exit_code, 7);
    }

    #[tokio::test]
    async fn exceeding_timeout_kills_and_reports() {
        let request = ExecRequest {
            argv: &["sleep".to_owned(), "5".to_owned()],
            assume_role_arn: None,
            timeout: Duration::from_millis(50),
        };
        let result = execute(&request, &HashMap::new(), None).await.unwrap();
        assert!(result.timed_out);
        assert_eq!(result.exit_code, -1);
    }
}
