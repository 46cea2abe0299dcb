//! Given-steps: preconditions and environment checks

use crate::common::{Error, Result};
use crate::harness::{Harness, RunState};
use crate::stack::{ComposeEngine, TaskRunner};

use super::StepOutcome;

/// The repository must carry both orchestration files. Their absence is a
/// structural failure, never a skip: nothing else in the suite can mean
/// anything without them.
pub fn repository_cloned(harness: &Harness) -> Result<StepOutcome> {
    let taskfile = harness.taskfile_path();
    if !taskfile.exists() {
        return Err(Error::Config(format!(
            "Taskfile.yml not found at {}",
            taskfile.display()
        )));
    }
    if harness.compose_path().is_none() {
        return Err(Error::Config(format!(
            "no compose file (docker-compose.yml or compose.yml) in {}",
            harness.config.repo_root.display()
        )));
    }
    Ok(StepOutcome::Done)
}

pub async fn docker_running(harness: &Harness) -> Result<StepOutcome> {
    if !ComposeEngine::available() {
        return Err(Error::dependency_missing("docker", "not found on PATH"));
    }
    let info = harness.compose.daemon_info().await?;
    if !info.success() {
        return Err(Error::dependency_missing(
            "docker",
            format!("daemon is not running: {}", info.stderr.trim()),
        ));
    }
    Ok(StepOutcome::Done)
}

pub async fn task_installed(harness: &Harness) -> Result<StepOutcome> {
    if !TaskRunner::available() {
        return Err(Error::dependency_missing("task", "not found on PATH"));
    }
    let version = harness.task.version().await?;
    if !version.success() {
        return Err(Error::dependency_missing(
            "task",
            format!("'task --version' failed: {}", version.stderr.trim()),
        ));
    }
    Ok(StepOutcome::Done)
}

/// Ensure the shared stack is up, starting it at most once per run
pub async fn services_running(harness: &Harness, state: &mut RunState) -> Result<StepOutcome> {
    if !ComposeEngine::available() {
        return Err(Error::dependency_missing("docker", "not found on PATH"));
    }
    if !TaskRunner::available() {
        return Err(Error::dependency_missing("task", "not found on PATH"));
    }
    state.ensure_stack(harness).await?;
    Ok(StepOutcome::Done)
}

/// Drive the stack into a stopped state. Shutdown warnings are tolerated;
/// the Then-steps verify the result.
pub async fn services_stopped(harness: &Harness) -> Result<StepOutcome> {
    if !ComposeEngine::available() {
        return Err(Error::dependency_missing("docker", "not found on PATH"));
    }
    let result = harness.compose.down(false).await?;
    if !result.success() {
        tracing::warn!(stderr = %result.stderr.trim(), "compose down reported warnings");
    }
    Ok(StepOutcome::Done)
}
