//! Process runner for the orchestration CLIs
//!
//! Spawns external commands with a working directory and timeout, capturing
//! stdout, stderr and the exit code. A non-zero exit is not an error here;
//! callers inspect the result and decide. A timeout kills the child and is
//! surfaced as an error.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::common::{Error, Result};

/// Outcome of one external command invocation.
///
/// Read-only once created; owned by the step that produced it.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// Rendered command line
    pub command: String,
    /// Exit code, None if terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// stdout and stderr concatenated, for checks that accept either stream
    pub fn combined_output(&self) -> String {
        format!("{}{}", self.stdout, self.stderr)
    }
}

/// Runs external commands from a fixed working directory
#[derive(Debug, Clone)]
pub struct CommandRunner {
    cwd: PathBuf,
}

impl CommandRunner {
    pub fn new(cwd: &Path) -> Self {
        Self {
            cwd: cwd.to_path_buf(),
        }
    }

    /// Check whether a program is on PATH
    pub fn program_available(program: &str) -> bool {
        which::which(program).is_ok()
    }

    /// Run a command to completion, capturing its output
    pub async fn run(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<ExecutionResult> {
        self.run_with_stdin(program, args, timeout, None).await
    }

    /// Run a command, optionally feeding text to its stdin
    pub async fn run_with_stdin(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
        stdin: Option<&str>,
    ) -> Result<ExecutionResult> {
        if !Self::program_available(program) {
            return Err(Error::dependency_missing(
                program,
                format!("'{program}' not found on PATH"),
            ));
        }

        let command_line = render_command(program, args);
        tracing::debug!(command = %command_line, "spawning");

        let mut command = Command::new(program);
        command
            .args(args)
            .current_dir(&self.cwd)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Dropping the future on timeout must also reap the child
            .kill_on_drop(true);

        let start = Instant::now();
        let mut child = command.spawn()?;

        if let Some(input) = stdin {
            if let Some(mut handle) = child.stdin.take() {
                handle.write_all(input.as_bytes()).await?;
            }
        }

        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                return Err(Error::CommandTimeout {
                    command: command_line,
                    seconds: timeout.as_secs(),
                })
            }
        };

        let result = ExecutionResult {
            command: command_line,
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            elapsed: start.elapsed(),
        };

        tracing::debug!(
            command = %result.command,
            code = ?result.exit_code,
            elapsed_ms = result.elapsed.as_millis() as u64,
            "finished"
        );

        Ok(result)
    }
}

fn render_command(program: &str, args: &[&str]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_captures_stdout_and_exit_code() {
        let runner = CommandRunner::new(Path::new("."));
        let result = runner
            .run("echo", &["hello"], Duration::from_secs(10))
            .await
            .unwrap();
        assert!(result.success());
        assert_eq!(result.stdout.trim(), "hello");
        assert!(result.stderr.is_empty());
    }

    #[tokio::test]
    async fn test_run_does_not_error_on_nonzero_exit() {
        let runner = CommandRunner::new(Path::new("."));
        let result = runner
            .run("sh", &["-c", "exit 3"], Duration::from_secs(10))
            .await
            .unwrap();
        assert!(!result.success());
        assert_eq!(result.exit_code, Some(3));
    }

    #[tokio::test]
    async fn test_run_times_out() {
        let runner = CommandRunner::new(Path::new("."));
        let err = runner
            .run("sh", &["-c", "sleep 30"], Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CommandTimeout { .. }));
    }

    #[tokio::test]
    async fn test_missing_program_is_dependency_error() {
        let runner = CommandRunner::new(Path::new("."));
        let err = runner
            .run("definitely-not-a-real-binary", &[], Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DependencyMissing { .. }));
    }

    #[tokio::test]
    async fn test_stdin_is_delivered() {
        let runner = CommandRunner::new(Path::new("."));
        let result = runner
            .run_with_stdin("cat", &[], Duration::from_secs(10), Some("piped input"))
            .await
            .unwrap();
        assert_eq!(result.stdout, "piped input");
    }
}
