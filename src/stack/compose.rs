//! Compose-engine CLI wrapper
//!
//! Thin layer over `docker compose` and `docker volume`. Raw invocations
//! return the ExecutionResult untouched; the parsed accessors (`ps`,
//! `volume_names`) raise CommandFailed when the engine itself errors,
//! because there is nothing meaningful to parse.

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use crate::common::{Error, Result};
use crate::exec::{CommandRunner, ExecutionResult};

const INFO_TIMEOUT: Duration = Duration::from_secs(10);
const PS_TIMEOUT: Duration = Duration::from_secs(30);
const LOGS_TIMEOUT: Duration = Duration::from_secs(60);
const CONFIG_TIMEOUT: Duration = Duration::from_secs(30);
const DOWN_TIMEOUT: Duration = Duration::from_secs(120);
const BUILD_TIMEOUT: Duration = Duration::from_secs(900);

/// State and health of one container, as reported by `ps`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerState {
    pub state: String,
    pub health: String,
}

/// Mapping from container name to its state; transient, rebuilt per call
pub type ContainerStatus = std::collections::BTreeMap<String, ContainerState>;

#[derive(Debug, Clone)]
pub struct ComposeEngine {
    runner: CommandRunner,
}

impl ComposeEngine {
    pub fn new(repo_root: &Path) -> Self {
        Self {
            runner: CommandRunner::new(repo_root),
        }
    }

    /// Whether the `docker` binary is on PATH
    pub fn available() -> bool {
        CommandRunner::program_available("docker")
    }

    /// `docker info` — non-zero exit means the daemon is not reachable
    pub async fn daemon_info(&self) -> Result<ExecutionResult> {
        self.runner.run("docker", &["info"], INFO_TIMEOUT).await
    }

    /// Run an arbitrary `docker compose` subcommand
    pub async fn compose(&self, args: &[&str], timeout: Duration) -> Result<ExecutionResult> {
        let mut full = vec!["compose"];
        full.extend_from_slice(args);
        self.runner.run("docker", &full, timeout).await
    }

    /// Container status parsed from `ps --format`
    pub async fn ps(&self) -> Result<ContainerStatus> {
        let result = self
            .compose(
                &["ps", "--format", "{{.Name}}\t{{.State}}\t{{.Health}}"],
                PS_TIMEOUT,
            )
            .await?;
        if !result.success() {
            return Err(command_failed(result));
        }
        Ok(parse_container_status(&result.stdout))
    }

    /// Container IDs from `ps -q`; `all` includes stopped containers
    pub async fn ps_quiet(&self, all: bool) -> Result<Vec<String>> {
        let args: &[&str] = if all { &["ps", "-a", "-q"] } else { &["ps", "-q"] };
        let result = self.compose(args, PS_TIMEOUT).await?;
        if !result.success() {
            return Err(command_failed(result));
        }
        Ok(result
            .stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// `logs --tail=N` across all services
    pub async fn logs(&self, tail: usize) -> Result<ExecutionResult> {
        let tail_flag = format!("--tail={tail}");
        self.compose(&["logs", &tail_flag], LOGS_TIMEOUT).await
    }

    pub async fn build(&self) -> Result<ExecutionResult> {
        self.compose(&["build"], BUILD_TIMEOUT).await
    }

    /// `down`, optionally removing named volumes
    pub async fn down(&self, volumes: bool) -> Result<ExecutionResult> {
        let args: &[&str] = if volumes { &["down", "-v"] } else { &["down"] };
        self.compose(args, DOWN_TIMEOUT).await
    }

    /// `config --quiet` — validates the compose file without output
    pub async fn config_quiet(&self) -> Result<ExecutionResult> {
        self.compose(&["config", "--quiet"], CONFIG_TIMEOUT).await
    }

    /// Named volumes from `docker volume ls -q`, optionally filtered by a
    /// name prefix
    pub async fn volume_names(&self, filter: Option<&str>) -> Result<BTreeSet<String>> {
        let filter_arg;
        let mut args = vec!["volume", "ls", "-q"];
        if let Some(prefix) = filter {
            filter_arg = format!("name={prefix}");
            args.push("--filter");
            args.push(&filter_arg);
        }
        let result = self.runner.run("docker", &args, PS_TIMEOUT).await?;
        if !result.success() {
            return Err(command_failed(result));
        }
        Ok(result
            .stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }
}

fn command_failed(result: ExecutionResult) -> Error {
    Error::CommandFailed {
        command: result.command,
        code: result.exit_code,
        stderr: result.stderr,
    }
}

fn parse_container_status(stdout: &str) -> ContainerStatus {
    let mut status = ContainerStatus::new();
    for line in stdout.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut parts = line.split('\t');
        let Some(name) = parts.next() else { continue };
        let Some(state) = parts.next() else { continue };
        let health = parts.next().unwrap_or("N/A");
        status.insert(
            name.to_string(),
            ContainerState {
                state: state.to_string(),
                health: if health.is_empty() {
                    "N/A".to_string()
                } else {
                    health.to_string()
                },
            },
        );
    }
    status
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_container_status() {
        let stdout = "stack-server-1\trunning\thealthy\nstack-webui-1\trunning\t\n\n";
        let status = parse_container_status(stdout);
        assert_eq!(status.len(), 2);
        assert_eq!(status["stack-server-1"].state, "running");
        assert_eq!(status["stack-server-1"].health, "healthy");
        assert_eq!(status["stack-webui-1"].health, "N/A");
    }

    #[test]
    fn test_parse_container_status_skips_short_lines() {
        let status = parse_container_status("lonely-name\n");
        assert!(status.is_empty());
    }

    #[test]
    fn test_parse_container_status_empty_output() {
        assert!(parse_container_status("").is_empty());
    }
}
