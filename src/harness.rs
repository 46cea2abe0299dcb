//! Shared harness state: configuration, probe and CLI wrappers
//!
//! The harness itself is read-only during a run. The stack guard tracks the
//! one piece of run-scoped state: whether this run started the service stack
//! and therefore owns its teardown.

use std::path::PathBuf;

use crate::common::{Error, HarnessConfig, Result};
use crate::probe::{self, HttpProbe};
use crate::stack::{task, ComposeEngine, TaskRunner};

pub struct Harness {
    pub config: HarnessConfig,
    pub probe: HttpProbe,
    pub task: TaskRunner,
    pub compose: ComposeEngine,
}

impl Harness {
    pub fn new(config: HarnessConfig) -> Result<Self> {
        let probe = HttpProbe::new()?;
        let task = TaskRunner::new(&config.repo_root);
        let compose = ComposeEngine::new(&config.repo_root);
        Ok(Self {
            config,
            probe,
            task,
            compose,
        })
    }

    pub fn taskfile_path(&self) -> PathBuf {
        crate::common::paths::taskfile(&self.config.repo_root)
    }

    pub fn compose_path(&self) -> Option<PathBuf> {
        crate::common::paths::compose_file(&self.config.repo_root)
    }

    /// One-shot check: does every health endpoint already answer?
    pub async fn stack_already_healthy(&self) -> bool {
        let endpoints = self.config.registry.health_endpoints();
        let health = probe::snapshot(&self.probe, &endpoints).await;
        !health.is_empty() && health.values().all(|healthy| *healthy)
    }

    /// Start the stack with `task up` and wait for it to become healthy.
    ///
    /// On a health deadline the failure message carries the tail of the
    /// compose logs, the first thing anyone would ask for.
    pub async fn start_stack(&self) -> Result<()> {
        let result = self.task.run("up", task::TASK_TIMEOUT).await?;
        if !result.success() {
            return Err(Error::CommandFailed {
                command: result.command,
                code: result.exit_code,
                stderr: result.stderr,
            });
        }

        let endpoints = self.config.registry.health_endpoints();
        let healthy = probe::wait_all(
            &self.probe,
            &endpoints,
            self.config.startup_timeout,
            self.config.poll_interval,
        )
        .await;

        if !healthy {
            let logs = match self.compose.logs(50).await {
                Ok(result) => result.combined_output(),
                Err(e) => format!("(could not collect logs: {e})"),
            };
            return Err(Error::assertion(format!(
                "Services did not become healthy within {}s. Logs:\n{}",
                self.config.startup_timeout.as_secs(),
                logs
            )));
        }

        Ok(())
    }

    /// Best-effort teardown; shutdown warnings are not failures
    pub async fn stop_stack(&self) {
        if let Err(e) = self.task.run("down", task::DOWN_TIMEOUT).await {
            tracing::warn!(error = %e, "task down failed during teardown");
        }
    }
}

/// Ownership marker for the shared stack
pub struct StackGuard {
    pub started_here: bool,
}

/// Run-scoped mutable state threaded through step execution
#[derive(Default)]
pub struct RunState {
    stack: Option<StackGuard>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure the shared stack is up, starting it at most once per run.
    /// A stack that was already running is reused and never torn down.
    pub async fn ensure_stack(&mut self, harness: &Harness) -> Result<()> {
        if self.stack.is_some() {
            return Ok(());
        }

        if harness.stack_already_healthy().await {
            tracing::info!("services already running, reusing them");
            self.stack = Some(StackGuard {
                started_here: false,
            });
            return Ok(());
        }

        tracing::info!("starting services with 'task up'");
        harness.start_stack().await?;
        self.stack = Some(StackGuard { started_here: true });
        Ok(())
    }

    /// Forget the current guard, e.g. after an isolated scenario tore the
    /// stack down out from under it
    pub fn invalidate(&mut self) {
        self.stack = None;
    }

    /// Tear down the stack if this run started it
    pub async fn teardown(&mut self, harness: &Harness) {
        if let Some(guard) = self.stack.take() {
            if guard.started_here {
                tracing::info!("stopping services started by this run");
                harness.stop_stack().await;
            }
        }
    }
}
