use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

use serde::{Deserialize, Serialize};

/// Exit code reported when a command exceeds its timeout.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// Errors from the command layer itself. A non-zero exit or a timeout is
/// NOT an error; see [`CommandResult`].
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("failed to spawn `{command}`: {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to collect output of `{command}`: {source}")]
    OutputFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// Outcome of one external command invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResult {
    /// The command line that was run, for diagnostics.
    pub command: String,
    /// Process exit code; [`TIMEOUT_EXIT_CODE`] on timeout.
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    #[serde(with = "duration_secs")]
    pub duration: Duration,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn timed_out(&self) -> bool {
        self.exit_code == TIMEOUT_EXIT_CODE
    }

    /// Stdout and stderr merged for prompt/diagnostic use.
    pub fn combined_output(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n\n--- stderr ---\n{}", self.stdout, self.stderr)
        }
    }
}

/// Run `program` with `args` in `cwd`, waiting at most `timeout`.
///
/// The child's stdin is closed; stdout and stderr are captured in full.
/// On timeout the child is killed and the result carries
/// [`TIMEOUT_EXIT_CODE`] with a note on stderr.
pub async fn run_command(
    program: &str,
    args: &[&str],
    cwd: &Path,
    timeout: Duration,
) -> Result<CommandResult, CommandError> {
    let command_line = render_command_line(program, args);
    let start = Instant::now();

    debug!(
        command = %command_line,
        cwd = %cwd.display(),
        timeout_secs = timeout.as_secs(),
        "Running command"
    );

    let child = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| CommandError::SpawnFailed {
            command: command_line.clone(),
            source,
        })?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(output) => output.map_err(|source| CommandError::OutputFailed {
            command: command_line.clone(),
            source,
        })?,
        Err(_) => {
            // kill_on_drop reaps the child when the future is dropped
            warn!(command = %command_line, "Command timed out");
            return Ok(CommandResult {
                command: command_line.clone(),
                exit_code: TIMEOUT_EXIT_CODE,
                stdout: String::new(),
                stderr: format!(
                    "command timed out after {} seconds: {}",
                    timeout.as_secs(),
                    command_line
                ),
                duration: start.elapsed(),
            });
        }
    };

    let duration = start.elapsed();
    let exit_code = output.status.code().unwrap_or(-1);

    debug!(
        command = %command_line,
        exit_code,
        duration_ms = duration.as_millis(),
        "Command completed"
    );

    Ok(CommandResult {
        command: command_line,
        exit_code,
        stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        duration,
    })
}

fn render_command_line(program: &str, args: &[&str]) -> String {
    let mut line = String::from(program);
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Ok(Duration::from_secs_f64(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout_and_exit_code() {
        let dir = std::env::temp_dir();
        let result = run_command("echo", &["hello"], &dir, Duration::from_secs(5))
            .await
            .unwrap();

        assert!(result.success());
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.stdout, "hello");
        assert!(result.stderr.is_empty());
        assert_eq!(result.command, "echo hello");
    }

    #[tokio::test]
    async fn nonzero_exit_is_not_an_error() {
        let dir = std::env::temp_dir();
        let result = run_command("false", &[], &dir, Duration::from_secs(5))
            .await
            .unwrap();

        assert!(!result.success());
        assert_ne!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn timeout_reported_as_result() {
        let dir = std::env::temp_dir();
        let result = run_command("sleep", &["5"], &dir, Duration::from_millis(100))
            .await
            .unwrap();

        assert!(result.timed_out());
        assert_eq!(result.exit_code, TIMEOUT_EXIT_CODE);
        assert!(result.stderr.contains("timed out"));
    }

    #[tokio::test]
    async fn missing_binary_is_an_error() {
        let dir = std::env::temp_dir();
        let result = run_command(
            "redgreen-no-such-binary",
            &[],
            &dir,
            Duration::from_secs(1),
        )
        .await;

        assert!(matches!(result, Err(CommandError::SpawnFailed { .. })));
    }
}
