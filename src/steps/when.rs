//! When-steps: actions whose observations are stashed in the context

use std::collections::BTreeMap;
use std::time::Duration;

use crate::common::{Error, Result};
use crate::harness::Harness;
use crate::scenario::{Arg, Captured, ScenarioContext};
use crate::stack::{descriptor, task};

use super::StepOutcome;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const HEALTH_TIMEOUT: Duration = Duration::from_secs(10);
const PS_TIMEOUT: Duration = Duration::from_secs(30);
const PORT_TIMEOUT: Duration = Duration::from_secs(1);

pub async fn run_task_up(harness: &Harness, ctx: &mut ScenarioContext) -> Result<StepOutcome> {
    let result = harness.task.run("up", task::TASK_TIMEOUT).await?;
    ctx.capture_exec("task_up", result);
    Ok(StepOutcome::Done)
}

/// Capture the volume set before stopping, so a Then-step can verify that a
/// plain `down` preserved it
pub async fn run_task_down(harness: &Harness, ctx: &mut ScenarioContext) -> Result<StepOutcome> {
    let before = harness.compose.volume_names(None).await?;
    ctx.insert("volumes_before", Captured::Names(before));

    let result = harness.task.run("down", task::DOWN_TIMEOUT).await?;
    ctx.capture_exec("task_down", result);
    Ok(StepOutcome::Done)
}

pub async fn run_task_list(harness: &Harness, ctx: &mut ScenarioContext) -> Result<StepOutcome> {
    let result = harness.task.list().await?;
    ctx.capture_exec("task_list", result);
    Ok(StepOutcome::Done)
}

pub async fn compose_logs(
    harness: &Harness,
    ctx: &mut ScenarioContext,
    args: &[Arg],
) -> Result<StepOutcome> {
    let tail = args
        .first()
        .ok_or_else(|| Error::Config("logs step requires a tail count".to_string()))?
        .as_int()? as usize;
    let result = harness.compose.logs(tail).await?;
    ctx.capture_exec("logs", result);
    Ok(StepOutcome::Done)
}

pub async fn compose_build(harness: &Harness, ctx: &mut ScenarioContext) -> Result<StepOutcome> {
    let result = harness.compose.build().await?;
    ctx.capture_exec("build", result);
    Ok(StepOutcome::Done)
}

pub async fn compose_config(harness: &Harness, ctx: &mut ScenarioContext) -> Result<StepOutcome> {
    let result = harness.compose.config_quiet().await?;
    ctx.capture_exec("config", result);
    Ok(StepOutcome::Done)
}

/// Capture project-prefixed volumes first; `down -v` must remove exactly
/// those
pub async fn compose_down_volumes(
    harness: &Harness,
    ctx: &mut ScenarioContext,
) -> Result<StepOutcome> {
    let before = harness
        .compose
        .volume_names(Some(harness.config.volume_prefix.as_str()))
        .await?;
    ctx.insert("project_volumes_before", Captured::Names(before));

    let result = harness.compose.down(true).await?;
    ctx.capture_exec("down_v", result);
    Ok(StepOutcome::Done)
}

pub async fn compose_ps(harness: &Harness, ctx: &mut ScenarioContext) -> Result<StepOutcome> {
    let result = harness.compose.compose(&["ps"], PS_TIMEOUT).await?;
    ctx.capture_exec("ps", result);
    Ok(StepOutcome::Done)
}

pub async fn check_docker_daemon(
    harness: &Harness,
    ctx: &mut ScenarioContext,
) -> Result<StepOutcome> {
    let result = harness.compose.daemon_info().await?;
    ctx.capture_exec("docker_info", result);
    Ok(StepOutcome::Done)
}

/// TCP-connect to every registry port and record which are in use
pub async fn check_ports(harness: &Harness, ctx: &mut ScenarioContext) -> Result<StepOutcome> {
    let mut status = BTreeMap::new();
    for port in harness.config.registry.ports() {
        let connect = tokio::net::TcpStream::connect(("127.0.0.1", port));
        let in_use = matches!(
            tokio::time::timeout(PORT_TIMEOUT, connect).await,
            Ok(Ok(_))
        );
        status.insert(port, in_use);
    }
    ctx.insert("ports", Captured::Ports(status));
    Ok(StepOutcome::Done)
}

/// Parse the Taskfile into the context. An absent file stores nothing; the
/// Then-steps treat that as a distinct, skippable state.
pub fn examine_taskfile(harness: &Harness, ctx: &mut ScenarioContext) -> Result<StepOutcome> {
    if let Some(mapping) = descriptor::read_yaml(&harness.taskfile_path())? {
        ctx.insert("taskfile", Captured::Yaml(mapping));
    }
    Ok(StepOutcome::Done)
}

pub fn examine_compose(harness: &Harness, ctx: &mut ScenarioContext) -> Result<StepOutcome> {
    if let Some(path) = harness.compose_path() {
        if let Some(mapping) = descriptor::read_yaml(&path)? {
            ctx.insert("compose", Captured::Yaml(mapping));
        }
    }
    Ok(StepOutcome::Done)
}

fn service_base(harness: &Harness, name: &str) -> Result<String> {
    harness
        .config
        .registry
        .get(name)
        .map(|entry| entry.base_url.clone())
        .ok_or_else(|| Error::Config(format!("service '{name}' is not in the registry")))
}

pub async fn request_health(harness: &Harness, ctx: &mut ScenarioContext) -> Result<StepOutcome> {
    let entry = harness
        .config
        .registry
        .get("feedback-server")
        .ok_or_else(|| Error::Config("service 'feedback-server' is not in the registry".into()))?;
    let response = harness
        .probe
        .get(entry.health_url(), HEALTH_TIMEOUT)
        .await?;
    ctx.capture_response(response);
    Ok(StepOutcome::Done)
}

pub async fn request_detailed_health(
    harness: &Harness,
    ctx: &mut ScenarioContext,
) -> Result<StepOutcome> {
    let base = service_base(harness, "feedback-server")?;
    let url = format!("{base}/api/v1/health/detailed");
    let response = harness.probe.get(&url, REQUEST_TIMEOUT).await?;
    ctx.capture_response(response);
    Ok(StepOutcome::Done)
}

pub async fn request_openapi(harness: &Harness, ctx: &mut ScenarioContext) -> Result<StepOutcome> {
    let base = service_base(harness, "feedback-server")?;
    let url = format!("{base}/api/docs/openapi.json");
    let response = harness.probe.get(&url, REQUEST_TIMEOUT).await?;
    ctx.capture_response(response);
    Ok(StepOutcome::Done)
}

pub async fn request_service_root(
    harness: &Harness,
    ctx: &mut ScenarioContext,
    args: &[Arg],
) -> Result<StepOutcome> {
    let name = args
        .first()
        .ok_or_else(|| Error::Config("root endpoint step requires a service name".to_string()))?
        .as_text()?;
    let base = service_base(harness, name)?;
    let response = harness.probe.get(&base, REQUEST_TIMEOUT).await?;
    ctx.capture_response(response);
    Ok(StepOutcome::Done)
}

pub async fn open_example_page(
    harness: &Harness,
    ctx: &mut ScenarioContext,
) -> Result<StepOutcome> {
    let base = service_base(harness, "feedback-example")?;
    let response = harness.probe.get(&base, REQUEST_TIMEOUT).await?;
    ctx.capture_response(response);
    Ok(StepOutcome::Done)
}
