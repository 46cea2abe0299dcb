//! End-to-end tests for the scenario harness
//!
//! These run without Docker, Task or the live stack. They exercise the
//! scenario pipeline against a scaffolded repository: configuration
//! discovery, scenario parsing, step resolution and command execution.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;

use stackcheck::common::HarnessConfig;
use stackcheck::exec::CommandRunner;
use stackcheck::scenario::{Isolation, Keyword, ScenarioFile};
use stackcheck::steps;

/// A scaffolded stack repository in a temp directory
struct StackRepo {
    dir: TempDir,
}

impl StackRepo {
    fn new() -> Self {
        let dir = TempDir::new().expect("create temp dir");
        fs::write(
            dir.path().join("Taskfile.yml"),
            "version: '3'\ntasks:\n  up:\n    desc: Start all services\n  down:\n    desc: Stop services\n",
        )
        .expect("write Taskfile");
        fs::write(
            dir.path().join("docker-compose.yml"),
            "services:\n  server:\n    image: demo\nvolumes:\n  server-data:\n",
        )
        .expect("write compose file");
        Self { dir }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn write_scenario(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path().join(name);
        fs::write(&path, content).expect("write scenario");
        path
    }
}

fn shipped_scenario_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios")
}

#[test]
fn shipped_scenarios_resolve_against_the_registry() {
    let registry = steps::registry();
    let mut checked = 0;

    for entry in fs::read_dir(shipped_scenario_dir()).expect("read scenarios dir") {
        let path = entry.expect("dir entry").path();
        if path.extension().map_or(true, |ext| ext != "yml") {
            continue;
        }

        let file = ScenarioFile::load(&path)
            .unwrap_or_else(|e| panic!("{} failed to load: {e}", path.display()));
        let parsed = file
            .parsed_steps()
            .unwrap_or_else(|e| panic!("{} failed to parse: {e}", path.display()));
        assert!(!parsed.is_empty(), "{} has no steps", path.display());

        for step in &parsed {
            registry.resolve(&step.text).unwrap_or_else(|e| {
                panic!("{}: step '{}' does not resolve: {e}", path.display(), step.text)
            });
        }
        checked += 1;
    }

    assert!(checked >= 8, "expected the shipped scenario suite, found {checked}");
}

#[test]
fn startup_scenario_begins_from_a_stopped_stack() {
    let path = shipped_scenario_dir().join("quick-evaluation.yml");
    let file = ScenarioFile::load(&path).expect("load startup scenario");
    assert_eq!(file.isolation, Isolation::Fresh);

    let parsed = file.parsed_steps().expect("parse steps");
    let stopped = parsed
        .iter()
        .position(|s| s.text == "services were previously running and stopped")
        .expect("startup scenario must declare the stopped precondition");
    let up = parsed
        .iter()
        .position(|s| s.text.contains("\"task up\""))
        .expect("startup scenario must start the stack");
    assert!(stopped < up);
}

#[test]
fn scenario_file_round_trip() {
    let repo = StackRepo::new();
    let path = repo.write_scenario(
        "smoke.yml",
        concat!(
            "name: Smoke\n",
            "description: Smallest possible run\n",
            "isolation: fresh\n",
            "steps:\n",
            "  - given services are running\n",
            "  - when I request the health endpoint\n",
            "  - then the response status is 200\n",
            "  - and the response indicates healthy status\n",
        ),
    );

    let file = ScenarioFile::load(&path).expect("load scenario");
    assert_eq!(file.name, "Smoke");
    assert_eq!(file.isolation, Isolation::Fresh);

    let parsed = file.parsed_steps().expect("parse steps");
    assert_eq!(parsed.len(), 4);
    assert_eq!(parsed[0].keyword, Keyword::Given);
    assert_eq!(parsed[3].keyword, Keyword::Then);
    assert_eq!(parsed[3].text, "the response indicates healthy status");
}

#[test]
fn malformed_scenario_is_rejected_with_path() {
    let repo = StackRepo::new();
    let path = repo.write_scenario("broken.yml", "name: [unterminated\n");
    let err = ScenarioFile::load(&path).expect_err("malformed YAML must not load");
    assert!(err.to_string().contains("broken.yml"));
}

#[test]
fn config_discovers_repo_root_from_nested_dir() {
    let repo = StackRepo::new();
    let nested = repo.path().join("packages/server/src");
    fs::create_dir_all(&nested).expect("create nested dirs");

    let config = HarnessConfig::load(&nested, Some(false)).expect("load config");
    assert_eq!(config.repo_root, repo.path());
    assert_eq!(config.registry.len(), 3);
    assert!(!config.require);
}

#[test]
fn config_override_file_replaces_registry() {
    let repo = StackRepo::new();
    fs::write(
        repo.path().join("stackcheck.yml"),
        concat!(
            "volume_prefix: demo-stack\n",
            "startup_timeout_secs: 30\n",
            "services:\n",
            "  api:\n",
            "    base_url: http://localhost:9100\n",
            "    health_url: http://localhost:9100/healthz\n",
        ),
    )
    .expect("write override");

    let config = HarnessConfig::load(repo.path(), None).expect("load config");
    assert_eq!(config.volume_prefix, "demo-stack");
    assert_eq!(config.startup_timeout, Duration::from_secs(30));
    assert_eq!(config.registry.len(), 1);
    assert_eq!(
        config.registry.get("api").expect("api entry").health_url(),
        "http://localhost:9100/healthz"
    );
}

#[tokio::test]
async fn commands_run_in_the_repo_root() {
    let repo = StackRepo::new();
    let runner = CommandRunner::new(repo.path());
    let result = runner
        .run("ls", &[], Duration::from_secs(10))
        .await
        .expect("run ls");
    assert!(result.success());
    assert!(result.stdout.contains("Taskfile.yml"));
    assert!(result.stdout.contains("docker-compose.yml"));
}

#[tokio::test]
async fn slow_commands_are_killed_at_the_deadline() {
    let repo = StackRepo::new();
    let runner = CommandRunner::new(repo.path());
    let err = runner
        .run("sh", &["-c", "sleep 20"], Duration::from_millis(200))
        .await
        .expect_err("must time out");
    assert!(err.to_string().contains("timed out"));
}

#[test]
fn registry_covers_given_when_then() {
    let registry = steps::registry();
    let specs = registry.specs();
    assert!(specs.len() > 40);
    assert!(specs.contains(&"I request the health endpoint"));
    assert!(specs.contains(&"all containers reach running state"));
    assert!(specs.contains(&"services are running"));
}
