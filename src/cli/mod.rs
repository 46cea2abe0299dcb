//! Command dispatch
//!
//! Builds the harness from the current directory and hands each subcommand
//! to its implementation. Scenario failures surface as a non-zero exit via
//! `Error::ScenariosFailed`; `check` reports and always exits cleanly.

use std::path::{Path, PathBuf};
use std::time::Duration;

use colored::Colorize;

use crate::commands::Commands;
use crate::common::{paths, Error, HarnessConfig, Result};
use crate::harness::Harness;
use crate::probe;
use crate::scenario::ScenarioRunner;
use crate::stack::{ComposeEngine, TaskRunner};
use crate::steps;

pub async fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Run { paths, require } => run(paths, require).await,
        Commands::Check => check().await,
        Commands::Wait { timeout } => wait(timeout).await,
        Commands::Status => status().await,
        Commands::Steps => list_steps(),
    }
}

fn build_harness(require_flag: Option<bool>) -> Result<Harness> {
    let cwd = std::env::current_dir()?;
    let config = HarnessConfig::load(&cwd, require_flag)?;
    Harness::new(config)
}

/// Expand the command-line paths into an ordered list of scenario files.
/// Directories are scanned one level deep for `.yml`/`.yaml` files.
fn collect_scenarios(paths: &[PathBuf], repo_root: &Path) -> Result<Vec<PathBuf>> {
    let roots: Vec<PathBuf> = if paths.is_empty() {
        vec![repo_root.join("scenarios")]
    } else {
        paths.to_vec()
    };

    let mut files = Vec::new();
    for root in roots {
        if root.is_dir() {
            let mut found = Vec::new();
            for entry in std::fs::read_dir(&root)? {
                let path = entry?.path();
                let is_yaml = path
                    .extension()
                    .is_some_and(|ext| ext == "yml" || ext == "yaml");
                if path.is_file() && is_yaml {
                    found.push(path);
                }
            }
            found.sort();
            files.extend(found);
        } else if root.is_file() {
            files.push(root);
        } else {
            return Err(Error::Config(format!(
                "scenario path '{}' does not exist",
                root.display()
            )));
        }
    }

    if files.is_empty() {
        return Err(Error::Config(
            "no scenario files found; pass files or a directory containing them".to_string(),
        ));
    }
    Ok(files)
}

async fn run(paths: Vec<PathBuf>, require: bool) -> Result<()> {
    let harness = build_harness(if require { Some(true) } else { None })?;
    let files = collect_scenarios(&paths, &harness.config.repo_root)?;
    tracing::info!(count = files.len(), "running scenarios");

    let mut runner = ScenarioRunner::new(harness);
    let summary = runner.run_files(&files).await?;
    runner.finish(&summary).await
}

fn report(label: &str, ok: bool, detail: &str) {
    let mark = if ok { "✓".green() } else { "✗".red() };
    if detail.is_empty() {
        println!("  {mark} {label}");
    } else {
        println!("  {mark} {label} ({detail})");
    }
}

/// Diagnose the local environment. Always exits cleanly; the point is the
/// report, not a verdict.
async fn check() -> Result<()> {
    println!("{}", "Environment check".bold());

    let cwd = std::env::current_dir()?;
    let config = match HarnessConfig::load(&cwd, None) {
        Ok(config) => config,
        Err(e) => {
            report("repository root", false, &e.to_string());
            return Ok(());
        }
    };
    report("repository root", true, &config.repo_root.display().to_string());

    let taskfile = paths::taskfile(&config.repo_root);
    report("Taskfile.yml", taskfile.exists(), "");
    match paths::compose_file(&config.repo_root) {
        Some(path) => report("compose file", true, &path.display().to_string()),
        None => report("compose file", false, "docker-compose.yml or compose.yml"),
    }

    let harness = Harness::new(config)?;

    if ComposeEngine::available() {
        match harness.compose.daemon_info().await {
            Ok(info) if info.success() => report("docker daemon", true, ""),
            Ok(info) => report("docker daemon", false, info.stderr.trim()),
            Err(e) => report("docker daemon", false, &e.to_string()),
        }
    } else {
        report("docker", false, "not found on PATH");
    }

    if TaskRunner::available() {
        match harness.task.version().await {
            Ok(version) if version.success() => {
                report("task", true, version.stdout.trim());
            }
            Ok(version) => report("task", false, version.stderr.trim()),
            Err(e) => report("task", false, &e.to_string()),
        }
    } else {
        report("task", false, "not found on PATH");
    }

    let endpoints = harness.config.registry.health_endpoints();
    let snapshot = probe::snapshot(&harness.probe, &endpoints).await;
    for endpoint in &endpoints {
        let up = snapshot.get(&endpoint.name).copied().unwrap_or(false);
        report(&endpoint.name, up, &endpoint.url);
    }

    Ok(())
}

async fn wait(timeout: u64) -> Result<()> {
    let harness = build_harness(None)?;
    let endpoints = harness.config.registry.health_endpoints();
    tracing::info!(timeout, services = endpoints.len(), "waiting for services");

    let healthy = probe::wait_all(
        &harness.probe,
        &endpoints,
        Duration::from_secs(timeout),
        harness.config.poll_interval,
    )
    .await;

    if healthy {
        println!("{}", "all services healthy".green());
        Ok(())
    } else {
        let snapshot = probe::snapshot(&harness.probe, &endpoints).await;
        for (name, up) in &snapshot {
            report(name, *up, "");
        }
        Err(Error::Timeout(timeout))
    }
}

async fn status() -> Result<()> {
    let harness = build_harness(None)?;

    println!("{}", "Containers".bold());
    match harness.compose.ps().await {
        Ok(status) if status.is_empty() => println!("  (none)"),
        Ok(status) => {
            for (name, state) in &status {
                println!("  {name}: {} / {}", state.state, state.health);
            }
        }
        Err(e) => println!("  {}", e.to_string().red()),
    }

    println!("{}", "Health endpoints".bold());
    let endpoints = harness.config.registry.health_endpoints();
    let snapshot = probe::snapshot(&harness.probe, &endpoints).await;
    for endpoint in &endpoints {
        let up = snapshot.get(&endpoint.name).copied().unwrap_or(false);
        report(&endpoint.name, up, &endpoint.url);
    }
    Ok(())
}

fn list_steps() -> Result<()> {
    for spec in steps::registry().specs() {
        println!("{spec}");
    }
    Ok(())
}
