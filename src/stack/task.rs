//! Task-runner CLI wrapper
//!
//! Delegates to the `task` binary in the repository root. Non-zero exits are
//! surfaced through the ExecutionResult, not raised.

use std::path::Path;
use std::time::Duration;

use crate::common::Result;
use crate::exec::{CommandRunner, ExecutionResult};

const VERSION_TIMEOUT: Duration = Duration::from_secs(5);
const LIST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for named tasks; `up` pulls and builds images
pub const TASK_TIMEOUT: Duration = Duration::from_secs(600);

/// Timeout for teardown tasks
pub const DOWN_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct TaskRunner {
    runner: CommandRunner,
}

impl TaskRunner {
    pub fn new(repo_root: &Path) -> Self {
        Self {
            runner: CommandRunner::new(repo_root),
        }
    }

    /// Whether the `task` binary is on PATH
    pub fn available() -> bool {
        CommandRunner::program_available("task")
    }

    pub async fn version(&self) -> Result<ExecutionResult> {
        self.runner.run("task", &["--version"], VERSION_TIMEOUT).await
    }

    /// Run a named task
    pub async fn run(&self, task: &str, timeout: Duration) -> Result<ExecutionResult> {
        self.runner.run("task", &[task], timeout).await
    }

    /// List defined tasks with their descriptions
    pub async fn list(&self) -> Result<ExecutionResult> {
        self.runner.run("task", &["--list"], LIST_TIMEOUT).await
    }
}
