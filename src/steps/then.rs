//! Then-steps: assertions over the context and the live stack
//!
//! Assertion mismatches are always hard failures. Only genuinely
//! environmental conditions (peer unreachable, binary missing) go through
//! the gate, and that conversion happens in the dispatcher.

use std::time::Duration;

use crate::common::{Error, Result};
use crate::gate::{self, Outcome};
use crate::harness::Harness;
use crate::probe::{self, ProbeMode};
use crate::scenario::{Arg, ScenarioContext};
use crate::stack::{ComposeFile, Taskfile};

use super::StepOutcome;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Health statuses accepted as "healthy"
const HEALTHY_STATUSES: [&str; 4] = ["ok", "healthy", "up", "running"];

fn int_arg(args: &[Arg], index: usize) -> Result<i64> {
    args.get(index)
        .ok_or_else(|| Error::Config(format!("step is missing argument {index}")))?
        .as_int()
}

fn text_arg<'a>(args: &'a [Arg], index: usize) -> Result<&'a str> {
    args.get(index)
        .ok_or_else(|| Error::Config(format!("step is missing argument {index}")))?
        .as_text()
}

/// Wait for the whole stack to answer healthily. Not reaching that state is
/// gate-eligible: the infrastructure may simply be absent here.
pub async fn containers_running(harness: &Harness) -> Result<StepOutcome> {
    let endpoints = harness.config.registry.health_endpoints();
    let healthy = probe::wait_all(
        &harness.probe,
        &endpoints,
        harness.config.startup_timeout,
        harness.config.poll_interval,
    )
    .await;

    match gate::resolve(healthy, harness.config.require) {
        Outcome::Proceed => Ok(StepOutcome::Done),
        outcome => {
            let status = match harness.compose.ps().await {
                Ok(status) => format!("{status:?}"),
                Err(e) => format!("(ps unavailable: {e})"),
            };
            if outcome == Outcome::Fail {
                Err(Error::assertion(format!(
                    "not all containers reached running state: {status}"
                )))
            } else {
                Ok(StepOutcome::Skipped(
                    "containers not running".to_string(),
                ))
            }
        }
    }
}

pub async fn access_service_at(harness: &Harness, args: &[Arg]) -> Result<StepOutcome> {
    let service = text_arg(args, 0)?;
    let url = text_arg(args, 1)?;
    let response = harness.probe.get(url, REQUEST_TIMEOUT).await?;
    if !ProbeMode::Content.accepts(response.status) {
        return Err(Error::assertion(format!(
            "cannot access {service} at {url}: status {}",
            response.status
        )));
    }
    Ok(StepOutcome::Done)
}

pub async fn all_endpoints_reachable(harness: &Harness) -> Result<StepOutcome> {
    for (name, entry) in harness.config.registry.iter() {
        let response = harness.probe.get(&entry.base_url, REQUEST_TIMEOUT).await?;
        if !entry.root_mode.accepts(response.status) {
            return Err(Error::assertion(format!(
                "service {name} not accessible at {}: status {}",
                entry.base_url, response.status
            )));
        }
    }
    Ok(StepOutcome::Done)
}

pub async fn service_responds_at_port(harness: &Harness, args: &[Arg]) -> Result<StepOutcome> {
    let service = text_arg(args, 0)?;
    let port = int_arg(args, 1)?;
    let mode = harness
        .config
        .registry
        .get(service)
        .map(|entry| entry.root_mode)
        .ok_or_else(|| Error::Config(format!("service '{service}' is not in the registry")))?;

    let url = format!("http://localhost:{port}");
    let response = harness.probe.get(&url, REQUEST_TIMEOUT).await?;
    if !mode.accepts(response.status) {
        return Err(Error::assertion(format!(
            "{service} not responding at port {port}: status {}",
            response.status
        )));
    }
    Ok(StepOutcome::Done)
}

pub fn response_status_is(ctx: &ScenarioContext, args: &[Arg]) -> Result<StepOutcome> {
    let expected = int_arg(args, 0)?;
    let response = ctx.last_response()?;
    if i64::from(response.status) != expected {
        return Err(Error::assertion(format!(
            "expected status {expected}, got {}",
            response.status
        )));
    }
    Ok(StepOutcome::Done)
}

pub fn page_loads(ctx: &ScenarioContext) -> Result<StepOutcome> {
    let response = ctx.last_response()?;
    if !ProbeMode::Content.accepts(response.status) {
        return Err(Error::assertion(format!(
            "page returned status {}",
            response.status
        )));
    }
    Ok(StepOutcome::Done)
}

pub fn healthy_status_body(ctx: &ScenarioContext) -> Result<StepOutcome> {
    let response = ctx.last_response()?;
    let body = response
        .json()
        .map_err(|_| Error::assertion("health response is not valid JSON".to_string()))?;

    let status = body
        .get("status")
        .and_then(|v| v.as_str())
        .ok_or_else(|| Error::assertion("health response is missing 'status'".to_string()))?;
    if !HEALTHY_STATUSES.contains(&status.to_lowercase().as_str()) {
        return Err(Error::assertion(format!("unexpected health status '{status}'")));
    }

    if body.get("version").is_none() {
        return Err(Error::assertion(
            "health response is missing 'version'".to_string(),
        ));
    }
    Ok(StepOutcome::Done)
}

fn openapi_body(ctx: &ScenarioContext) -> Result<serde_json::Value> {
    ctx.last_response()?
        .json()
        .map_err(|_| Error::assertion("OpenAPI document is not valid JSON".to_string()))
}

pub fn openapi_declares_version(ctx: &ScenarioContext) -> Result<StepOutcome> {
    let body = openapi_body(ctx)?;
    if body.get("openapi").is_none() && body.get("swagger").is_none() {
        return Err(Error::assertion(
            "document declares neither 'openapi' nor 'swagger'".to_string(),
        ));
    }
    Ok(StepOutcome::Done)
}

pub fn openapi_info(ctx: &ScenarioContext) -> Result<StepOutcome> {
    let body = openapi_body(ctx)?;
    let info = body
        .get("info")
        .ok_or_else(|| Error::assertion("document is missing 'info'".to_string()))?;
    if info.get("title").is_none() {
        return Err(Error::assertion("document is missing 'info.title'".to_string()));
    }
    if info.get("version").is_none() {
        return Err(Error::assertion(
            "document is missing 'info.version'".to_string(),
        ));
    }
    Ok(StepOutcome::Done)
}

pub fn openapi_paths(ctx: &ScenarioContext) -> Result<StepOutcome> {
    let body = openapi_body(ctx)?;
    match body.get("paths").and_then(|v| v.as_object()) {
        Some(paths) if !paths.is_empty() => Ok(StepOutcome::Done),
        Some(_) => Err(Error::assertion("document 'paths' is empty".to_string())),
        None => Err(Error::assertion("document is missing 'paths'".to_string())),
    }
}

pub fn page_is_html(ctx: &ScenarioContext) -> Result<StepOutcome> {
    let response = ctx.last_response()?;
    if !response.is_html() {
        return Err(Error::assertion(
            "response body does not look like an HTML document".to_string(),
        ));
    }
    Ok(StepOutcome::Done)
}

pub fn task_list_non_empty(ctx: &ScenarioContext) -> Result<StepOutcome> {
    let result = ctx.exec("task_list")?;
    if !result.success() {
        return Err(Error::assertion(format!(
            "task --list failed: {}",
            result.stderr.trim()
        )));
    }
    if result.combined_output().len() <= 50 {
        return Err(Error::assertion(
            "task list output seems too short".to_string(),
        ));
    }
    Ok(StepOutcome::Done)
}

/// Prefer the on-disk check when the Taskfile was examined; otherwise fall
/// back to the `task --list` output, which only prints described tasks
pub fn tasks_documented(ctx: &ScenarioContext) -> Result<StepOutcome> {
    if ctx.contains("taskfile") {
        let taskfile = Taskfile::parse(ctx.yaml("taskfile")?.clone())?;
        if !taskfile.has_documented_task() {
            return Err(Error::assertion(
                "no task in the Taskfile carries a desc".to_string(),
            ));
        }
        return Ok(StepOutcome::Done);
    }

    let result = ctx.exec("task_list")?;
    let lines = result
        .combined_output()
        .lines()
        .filter(|line| !line.trim().is_empty())
        .count();
    if lines <= 3 {
        return Err(Error::assertion(format!(
            "expected several described tasks, got {lines} line(s)"
        )));
    }
    Ok(StepOutcome::Done)
}

pub fn command_succeeded(ctx: &ScenarioContext) -> Result<StepOutcome> {
    let result = ctx.exec(crate::scenario::context::LAST_EXEC)?;
    if !result.success() {
        return Err(Error::assertion(format!(
            "'{}' failed with exit code {:?}: {}",
            result.command,
            result.exit_code,
            result.stderr.trim()
        )));
    }
    Ok(StepOutcome::Done)
}

/// Load the examined Taskfile or mark the scenario skipped when the file
/// was absent
fn examined_taskfile(ctx: &ScenarioContext) -> Result<std::result::Result<Taskfile, StepOutcome>> {
    if !ctx.contains("taskfile") {
        return Ok(Err(StepOutcome::Skipped("Taskfile.yml not found".to_string())));
    }
    let mapping = ctx.yaml("taskfile")?;
    Ok(Ok(Taskfile::parse(mapping.clone())?))
}

fn examined_compose(ctx: &ScenarioContext) -> Result<std::result::Result<ComposeFile, StepOutcome>> {
    if !ctx.contains("compose") {
        return Ok(Err(StepOutcome::Skipped("compose file not found".to_string())));
    }
    let mapping = ctx.yaml("compose")?;
    Ok(Ok(ComposeFile::parse(mapping.clone())?))
}

pub fn taskfile_valid(ctx: &ScenarioContext) -> Result<StepOutcome> {
    match examined_taskfile(ctx)? {
        Ok(_) => Ok(StepOutcome::Done),
        Err(skip) => Ok(skip),
    }
}

pub fn taskfile_defines_task(ctx: &ScenarioContext, args: &[Arg]) -> Result<StepOutcome> {
    let name = text_arg(args, 0)?;
    match examined_taskfile(ctx)? {
        Ok(taskfile) => {
            if !taskfile.has_task(name) {
                return Err(Error::assertion(format!(
                    "task '{name}' is not defined; available: {:?}",
                    taskfile.task_names()
                )));
            }
            Ok(StepOutcome::Done)
        }
        Err(skip) => Ok(skip),
    }
}

pub fn reset_task_defined(ctx: &ScenarioContext) -> Result<StepOutcome> {
    match examined_taskfile(ctx)? {
        Ok(taskfile) => {
            if !taskfile.has_reset_task() {
                return Err(Error::assertion(
                    "no reset/clean task found in the Taskfile".to_string(),
                ));
            }
            Ok(StepOutcome::Done)
        }
        Err(skip) => Ok(skip),
    }
}

pub fn compose_declares_services(ctx: &ScenarioContext) -> Result<StepOutcome> {
    match examined_compose(ctx)? {
        Ok(compose) => {
            if compose.service_names().is_empty() {
                return Err(Error::assertion(
                    "compose file declares no services".to_string(),
                ));
            }
            Ok(StepOutcome::Done)
        }
        Err(skip) => Ok(skip),
    }
}

pub fn compose_declares_volumes(ctx: &ScenarioContext) -> Result<StepOutcome> {
    match examined_compose(ctx)? {
        Ok(compose) => {
            if !compose.has_volumes() {
                return Err(Error::assertion(
                    "no volumes declared in the compose file".to_string(),
                ));
            }
            Ok(StepOutcome::Done)
        }
        Err(skip) => Ok(skip),
    }
}

pub fn volume_entries_well_formed(ctx: &ScenarioContext) -> Result<StepOutcome> {
    match examined_compose(ctx)? {
        Ok(compose) => {
            let bad = compose.malformed_volume_entries();
            if !bad.is_empty() {
                return Err(Error::assertion(format!(
                    "malformed volume entries: {bad:?}"
                )));
            }
            Ok(StepOutcome::Done)
        }
        Err(skip) => Ok(skip),
    }
}

pub async fn containers_stopped(harness: &Harness) -> Result<StepOutcome> {
    let running = harness.compose.ps_quiet(false).await?;
    if !running.is_empty() {
        return Err(Error::assertion(format!(
            "containers still running: {running:?}"
        )));
    }
    Ok(StepOutcome::Done)
}

pub async fn containers_removed(harness: &Harness) -> Result<StepOutcome> {
    let existing = harness.compose.ps_quiet(true).await?;
    if !existing.is_empty() {
        return Err(Error::assertion(format!(
            "containers still exist: {existing:?}"
        )));
    }
    Ok(StepOutcome::Done)
}

/// Every volume that existed before `task down` must still exist
pub async fn volumes_preserved(harness: &Harness, ctx: &ScenarioContext) -> Result<StepOutcome> {
    let before = ctx.names("volumes_before")?;
    let after = harness.compose.volume_names(None).await?;
    let missing: Vec<&String> = before.difference(&after).collect();
    if !missing.is_empty() {
        return Err(Error::assertion(format!(
            "volumes removed by plain down: {missing:?}"
        )));
    }
    Ok(StepOutcome::Done)
}

/// No project-prefixed volume from before `down -v` may survive it
pub async fn project_volumes_removed(
    harness: &Harness,
    ctx: &ScenarioContext,
) -> Result<StepOutcome> {
    let before = ctx.names("project_volumes_before")?;
    let after = harness
        .compose
        .volume_names(Some(harness.config.volume_prefix.as_str()))
        .await?;
    let surviving: Vec<&String> = before.intersection(&after).collect();
    if !surviving.is_empty() {
        return Err(Error::assertion(format!(
            "project volumes survived down -v: {surviving:?}"
        )));
    }
    Ok(StepOutcome::Done)
}

pub fn config_validation_passes(ctx: &ScenarioContext) -> Result<StepOutcome> {
    let result = ctx.exec("config")?;
    if !result.success() {
        return Err(Error::assertion(format!(
            "config validation failed: {}",
            result.stderr.trim()
        )));
    }
    Ok(StepOutcome::Done)
}

pub fn no_config_errors(ctx: &ScenarioContext) -> Result<StepOutcome> {
    let result = ctx.exec("config")?;
    if result.stderr.to_lowercase().contains("error") {
        return Err(Error::assertion(format!(
            "errors reported during validation: {}",
            result.stderr.trim()
        )));
    }
    Ok(StepOutcome::Done)
}

pub fn docker_reports_running(ctx: &ScenarioContext) -> Result<StepOutcome> {
    let result = ctx.exec("docker_info")?;
    if !result.success() {
        return Err(Error::assertion(format!(
            "Docker daemon not running: {}",
            result.stderr.trim()
        )));
    }
    Ok(StepOutcome::Done)
}

pub fn ports_reported(ctx: &ScenarioContext) -> Result<StepOutcome> {
    let ports = ctx.ports("ports")?;
    if ports.is_empty() {
        return Err(Error::assertion("no service ports were checked".to_string()));
    }
    Ok(StepOutcome::Done)
}

pub fn ports_in_use(ctx: &ScenarioContext) -> Result<StepOutcome> {
    let ports = ctx.ports("ports")?;
    let free: Vec<u16> = ports
        .iter()
        .filter(|(_, in_use)| !**in_use)
        .map(|(port, _)| *port)
        .collect();
    if !free.is_empty() {
        return Err(Error::assertion(format!(
            "nothing is listening on port(s) {free:?}"
        )));
    }
    Ok(StepOutcome::Done)
}

pub fn logs_not_empty(ctx: &ScenarioContext) -> Result<StepOutcome> {
    let result = ctx.exec("logs")?;
    if result.combined_output().trim().is_empty() {
        return Err(Error::assertion("no log output received".to_string()));
    }
    Ok(StepOutcome::Done)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::ExecutionResult;
    use crate::scenario::Captured;

    fn ctx_with_taskfile(yaml: &str) -> ScenarioContext {
        let mut ctx = ScenarioContext::new();
        let mapping: serde_yaml::Mapping = serde_yaml::from_str(yaml).unwrap();
        ctx.insert("taskfile", Captured::Yaml(mapping));
        ctx
    }

    fn list_output(stdout: &str) -> ExecutionResult {
        ExecutionResult {
            command: "task --list".to_string(),
            exit_code: Some(0),
            stdout: stdout.to_string(),
            stderr: String::new(),
            elapsed: Duration::from_millis(10),
        }
    }

    #[test]
    fn test_documented_tasks_checked_on_disk_when_examined() {
        let ctx = ctx_with_taskfile("version: '3'\ntasks:\n  up:\n    desc: start the stack\n");
        assert_eq!(tasks_documented(&ctx).unwrap(), StepOutcome::Done);

        let ctx = ctx_with_taskfile("version: '3'\ntasks:\n  up:\n    cmds: [echo hi]\n");
        assert!(tasks_documented(&ctx).is_err());
    }

    #[test]
    fn test_documented_tasks_falls_back_to_list_output() {
        let mut ctx = ScenarioContext::new();
        ctx.capture_exec(
            "task_list",
            list_output("task: Available tasks:\n* up: Start\n* down: Stop\n* logs: Tail\n"),
        );
        assert_eq!(tasks_documented(&ctx).unwrap(), StepOutcome::Done);

        let mut ctx = ScenarioContext::new();
        ctx.capture_exec("task_list", list_output("task: Available tasks:\n"));
        assert!(tasks_documented(&ctx).is_err());
    }

    #[test]
    fn test_healthy_status_body_accepts_common_statuses() {
        let mut ctx = ScenarioContext::new();
        ctx.capture_response(crate::probe::ProbeResponse {
            status: 200,
            body: r#"{"status":"Healthy","version":"1.2.0"}"#.to_string(),
        });
        assert_eq!(healthy_status_body(&ctx).unwrap(), StepOutcome::Done);

        let mut ctx = ScenarioContext::new();
        ctx.capture_response(crate::probe::ProbeResponse {
            status: 200,
            body: r#"{"status":"degraded","version":"1.2.0"}"#.to_string(),
        });
        assert!(healthy_status_body(&ctx).is_err());
    }
}
