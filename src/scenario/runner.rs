//! Scenario execution and per-run reporting
//!
//! Each scenario gets a fresh context; the stack guard lives for the whole
//! run. A step failure aborts its scenario but never the run. Skips
//! propagate: once a step skips, the rest of the scenario is moot.

use std::path::Path;

use colored::Colorize;

use crate::common::{Error, Result};
use crate::harness::{Harness, RunState};
use crate::scenario::{Isolation, ScenarioContext, ScenarioFile, StepRegistry};
use crate::steps::{self, StepAction, StepOutcome};

/// Terminal state of one scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioStatus {
    Passed,
    Failed,
    Skipped,
}

/// Outcome of one scenario
#[derive(Debug, Clone)]
pub struct ScenarioReport {
    pub name: String,
    pub status: ScenarioStatus,
    pub steps_run: usize,
    pub steps_total: usize,
    pub detail: Option<String>,
}

/// Aggregated outcome of a run
#[derive(Debug, Default)]
pub struct RunSummary {
    pub reports: Vec<ScenarioReport>,
}

impl RunSummary {
    pub fn count(&self, status: ScenarioStatus) -> usize {
        self.reports
            .iter()
            .filter(|report| report.status == status)
            .count()
    }

    pub fn passed(&self) -> usize {
        self.count(ScenarioStatus::Passed)
    }

    pub fn failed(&self) -> usize {
        self.count(ScenarioStatus::Failed)
    }

    pub fn skipped(&self) -> usize {
        self.count(ScenarioStatus::Skipped)
    }

    pub fn all_passed(&self) -> bool {
        self.failed() == 0
    }
}

pub struct ScenarioRunner {
    harness: Harness,
    registry: StepRegistry<StepAction>,
    state: RunState,
}

impl ScenarioRunner {
    pub fn new(harness: Harness) -> Self {
        Self {
            harness,
            registry: steps::registry(),
            state: RunState::new(),
        }
    }

    /// Run every scenario file in order. Unreadable or malformed files abort
    /// the run; step failures are collected into the summary instead.
    pub async fn run_files(&mut self, paths: &[impl AsRef<Path>]) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        for path in paths {
            summary.reports.push(self.run_file(path.as_ref()).await?);
        }
        Ok(summary)
    }

    pub async fn run_file(&mut self, path: &Path) -> Result<ScenarioReport> {
        let file = ScenarioFile::load(path)?;
        self.run_scenario(&file).await
    }

    pub async fn run_scenario(&mut self, file: &ScenarioFile) -> Result<ScenarioReport> {
        let steps = file.parsed_steps()?;
        let steps_total = steps.len();

        println!();
        println!("{} {}", "Scenario:".bold(), file.name.bold());
        if let Some(description) = &file.description {
            println!("  {}", description.dimmed());
        }

        if file.isolation == Isolation::Fresh {
            self.reset_stack().await;
        }

        let mut ctx = ScenarioContext::new();
        let mut steps_run = 0;
        let mut status = ScenarioStatus::Passed;
        let mut detail = None;

        for step in &steps {
            let label = format!("{} {}", step.keyword.as_str(), step.text);

            let resolved = self.registry.resolve(&step.text);
            let outcome = match resolved {
                Ok((action, args)) => {
                    steps::execute(action, &args, &self.harness, &mut self.state, &mut ctx)
                        .await
                }
                Err(e) => Err(e),
            };

            match outcome {
                Ok(StepOutcome::Done) => {
                    steps_run += 1;
                    println!("  {} {label}", "✓".green());
                }
                Ok(StepOutcome::Skipped(reason)) => {
                    println!("  {} {label} {}", "-".yellow(), format!("({reason})").yellow());
                    status = ScenarioStatus::Skipped;
                    detail = Some(reason);
                    break;
                }
                Err(e) => {
                    println!("  {} {label}", "✗".red());
                    println!("    {}", e.to_string().red());
                    status = ScenarioStatus::Failed;
                    detail = Some(e.to_string());
                    break;
                }
            }
        }

        if file.isolation == Isolation::Fresh {
            self.reset_stack().await;
        }

        Ok(ScenarioReport {
            name: file.name.clone(),
            status,
            steps_run,
            steps_total,
            detail,
        })
    }

    /// Tear the stack down for an isolated scenario and forget any shared
    /// guard, so a later scenario restarts it as needed
    async fn reset_stack(&mut self) {
        self.harness.stop_stack().await;
        self.state.invalidate();
    }

    /// Print the run summary and release the stack if this run started it
    pub async fn finish(&mut self, summary: &RunSummary) -> Result<()> {
        self.state.teardown(&self.harness).await;

        println!();
        let line = format!(
            "{} passed, {} failed, {} skipped",
            summary.passed(),
            summary.failed(),
            summary.skipped()
        );
        if summary.all_passed() {
            println!("{}", line.green());
            Ok(())
        } else {
            println!("{}", line.red());
            Err(Error::ScenariosFailed(summary.failed()))
        }
    }

    pub fn harness(&self) -> &Harness {
        &self.harness
    }
}
