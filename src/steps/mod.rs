//! Built-in step library
//!
//! Step text resolves through the registry to a `StepAction`, which is
//! dispatched here to the Given/When/Then handlers. Environmental errors
//! (missing binary, unreachable peer) pass through the environment gate and
//! become skips in lenient runs; everything else fails the scenario.

mod given;
mod then;
mod when;

use crate::common::config::REQUIRE_ENV;
use crate::common::{Error, Result};
use crate::gate::{self, Outcome};
use crate::harness::{Harness, RunState};
use crate::scenario::{Arg, ScenarioContext, StepRegistry};

/// Result of a single executed step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Done,
    /// The step could not run for environmental reasons; the scenario is
    /// marked skipped, not failed
    Skipped(String),
}

/// Every step the harness knows how to execute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepAction {
    // Given
    RepositoryCloned,
    DockerRunning,
    TaskInstalled,
    ServicesRunning,
    AnyServiceState,
    ServicesStopped,
    // When
    RunTaskUp,
    RunTaskDown,
    RunTaskList,
    ComposeLogs,
    ComposeBuild,
    ComposeConfig,
    ComposeDownVolumes,
    ComposePs,
    CheckDockerDaemon,
    CheckPorts,
    ExamineTaskfile,
    ExamineCompose,
    RequestHealth,
    RequestDetailedHealth,
    RequestOpenApi,
    RequestServiceRoot,
    OpenExamplePage,
    // Then
    ContainersRunning,
    AccessServiceAt,
    AllEndpointsReachable,
    ServiceRespondsAtPort,
    ResponseStatusIs,
    PageLoads,
    HealthyStatusBody,
    OpenApiDeclaresVersion,
    OpenApiInfo,
    OpenApiPaths,
    PageIsHtml,
    TaskListNonEmpty,
    TasksDocumented,
    CommandSucceeded,
    TaskfileValid,
    TaskfileDefinesTask,
    ResetTaskDefined,
    ComposeDeclaresServices,
    ComposeDeclaresVolumes,
    VolumeEntriesWellFormed,
    ContainersStopped,
    ContainersRemoved,
    VolumesPreserved,
    ProjectVolumesRemoved,
    ConfigValidationPasses,
    NoConfigErrors,
    DockerReportsRunning,
    PortsReported,
    PortsInUse,
    LogsNotEmpty,
}

/// Build the registry of all built-in steps.
///
/// Order matters only where patterns overlap; keep the specific ones first.
pub fn registry() -> StepRegistry<StepAction> {
    use StepAction::*;

    let mut reg = StepRegistry::new();

    // Given
    reg.register("the repository is cloned", RepositoryCloned);
    reg.register("Docker is installed and running", DockerRunning);
    reg.register("Task is installed", TaskInstalled);
    reg.register("services are running", ServicesRunning);
    reg.register("services may or may not be running", AnyServiceState);
    reg.register("services were previously running and stopped", ServicesStopped);

    // When
    reg.register("I run \"task up\" to start all services", RunTaskUp);
    reg.register("I run \"task down\" to stop services", RunTaskDown);
    reg.register("I run \"task --list\"", RunTaskList);
    reg.register("I run docker compose logs with tail {d}", ComposeLogs);
    reg.register("I run docker compose build", ComposeBuild);
    reg.register("I run docker compose config validation", ComposeConfig);
    reg.register("I run docker compose down with volumes", ComposeDownVolumes);
    reg.register("I run docker compose ps", ComposePs);
    reg.register("I check the Docker daemon status", CheckDockerDaemon);
    reg.register("I check port availability for service ports", CheckPorts);
    reg.register("I examine the Taskfile", ExamineTaskfile);
    reg.register("I examine the compose file", ExamineCompose);
    reg.register("I request the health endpoint", RequestHealth);
    reg.register("I request the detailed health endpoint", RequestDetailedHealth);
    reg.register("I request the OpenAPI document", RequestOpenApi);
    reg.register("I open the feedback-example page", OpenExamplePage);
    reg.register("I request the {w} root endpoint", RequestServiceRoot);

    // Then
    reg.register("all containers reach running state", ContainersRunning);
    reg.register("I can access {w} at {q}", AccessServiceAt);
    reg.register("all service endpoints are reachable", AllEndpointsReachable);
    reg.register("{w} responds at port {d}", ServiceRespondsAtPort);
    reg.register("the response status is {d}", ResponseStatusIs);
    reg.register("the page loads successfully", PageLoads);
    reg.register("the response indicates healthy status", HealthyStatusBody);
    reg.register("the document declares an OpenAPI version", OpenApiDeclaresVersion);
    reg.register("the document describes the API title and version", OpenApiInfo);
    reg.register("the document lists at least one path", OpenApiPaths);
    reg.register("the response is served as HTML", PageIsHtml);
    reg.register("the output lists available tasks", TaskListNonEmpty);
    reg.register("each task has a description", TasksDocumented);
    reg.register("the command succeeds", CommandSucceeded);
    reg.register("the Taskfile is valid", TaskfileValid);
    reg.register("the Taskfile defines a {q} task", TaskfileDefinesTask);
    reg.register("a reset or clean task is defined", ResetTaskDefined);
    reg.register("the compose file declares services", ComposeDeclaresServices);
    reg.register("volumes are declared for data persistence", ComposeDeclaresVolumes);
    reg.register("volume entries are well formed", VolumeEntriesWellFormed);
    reg.register("all containers are stopped", ContainersStopped);
    reg.register("all containers are removed", ContainersRemoved);
    reg.register("named volumes are preserved", VolumesPreserved);
    reg.register("project volumes are removed", ProjectVolumesRemoved);
    reg.register("configuration validation passes", ConfigValidationPasses);
    reg.register("no errors are reported", NoConfigErrors);
    reg.register("Docker reports it is running", DockerReportsRunning);
    reg.register("port availability is reported", PortsReported);
    reg.register("every service port is in use", PortsInUse);
    reg.register("log output is not empty", LogsNotEmpty);

    reg
}

/// Execute one resolved step, converting environmental errors through the
/// gate
pub async fn execute(
    action: StepAction,
    args: &[Arg],
    harness: &Harness,
    state: &mut RunState,
    ctx: &mut ScenarioContext,
) -> Result<StepOutcome> {
    match dispatch(action, args, harness, state, ctx).await {
        Err(e) if e.is_environmental() => gated(harness.config.require, e),
        other => other,
    }
}

/// Convert an environmental error per the strictness flag
pub(crate) fn gated(require: bool, error: Error) -> Result<StepOutcome> {
    match gate::resolve(false, require) {
        Outcome::Fail => Err(error),
        _ => Ok(StepOutcome::Skipped(format!(
            "{error} (set {REQUIRE_ENV}=true to fail)"
        ))),
    }
}

async fn dispatch(
    action: StepAction,
    args: &[Arg],
    harness: &Harness,
    state: &mut RunState,
    ctx: &mut ScenarioContext,
) -> Result<StepOutcome> {
    use StepAction::*;

    match action {
        // Given
        RepositoryCloned => given::repository_cloned(harness),
        DockerRunning => given::docker_running(harness).await,
        TaskInstalled => given::task_installed(harness).await,
        ServicesRunning => given::services_running(harness, state).await,
        AnyServiceState => Ok(StepOutcome::Done),
        ServicesStopped => given::services_stopped(harness).await,

        // When
        RunTaskUp => when::run_task_up(harness, ctx).await,
        RunTaskDown => when::run_task_down(harness, ctx).await,
        RunTaskList => when::run_task_list(harness, ctx).await,
        ComposeLogs => when::compose_logs(harness, ctx, args).await,
        ComposeBuild => when::compose_build(harness, ctx).await,
        ComposeConfig => when::compose_config(harness, ctx).await,
        ComposeDownVolumes => when::compose_down_volumes(harness, ctx).await,
        ComposePs => when::compose_ps(harness, ctx).await,
        CheckDockerDaemon => when::check_docker_daemon(harness, ctx).await,
        CheckPorts => when::check_ports(harness, ctx).await,
        ExamineTaskfile => when::examine_taskfile(harness, ctx),
        ExamineCompose => when::examine_compose(harness, ctx),
        RequestHealth => when::request_health(harness, ctx).await,
        RequestDetailedHealth => when::request_detailed_health(harness, ctx).await,
        RequestOpenApi => when::request_openapi(harness, ctx).await,
        RequestServiceRoot => when::request_service_root(harness, ctx, args).await,
        OpenExamplePage => when::open_example_page(harness, ctx).await,

        // Then
        ContainersRunning => then::containers_running(harness).await,
        AccessServiceAt => then::access_service_at(harness, args).await,
        AllEndpointsReachable => then::all_endpoints_reachable(harness).await,
        ServiceRespondsAtPort => then::service_responds_at_port(harness, args).await,
        ResponseStatusIs => then::response_status_is(ctx, args),
        PageLoads => then::page_loads(ctx),
        HealthyStatusBody => then::healthy_status_body(ctx),
        OpenApiDeclaresVersion => then::openapi_declares_version(ctx),
        OpenApiInfo => then::openapi_info(ctx),
        OpenApiPaths => then::openapi_paths(ctx),
        PageIsHtml => then::page_is_html(ctx),
        TaskListNonEmpty => then::task_list_non_empty(ctx),
        TasksDocumented => then::tasks_documented(ctx),
        CommandSucceeded => then::command_succeeded(ctx),
        TaskfileValid => then::taskfile_valid(ctx),
        TaskfileDefinesTask => then::taskfile_defines_task(ctx, args),
        ResetTaskDefined => then::reset_task_defined(ctx),
        ComposeDeclaresServices => then::compose_declares_services(ctx),
        ComposeDeclaresVolumes => then::compose_declares_volumes(ctx),
        VolumeEntriesWellFormed => then::volume_entries_well_formed(ctx),
        ContainersStopped => then::containers_stopped(harness).await,
        ContainersRemoved => then::containers_removed(harness).await,
        VolumesPreserved => then::volumes_preserved(harness, ctx).await,
        ProjectVolumesRemoved => then::project_volumes_removed(harness, ctx).await,
        ConfigValidationPasses => then::config_validation_passes(ctx),
        NoConfigErrors => then::no_config_errors(ctx),
        DockerReportsRunning => then::docker_reports_running(ctx),
        PortsReported => then::ports_reported(ctx),
        PortsInUse => then::ports_in_use(ctx),
        LogsNotEmpty => then::logs_not_empty(ctx),
    }
}
