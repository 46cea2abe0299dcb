//! On-disk orchestration descriptors
//!
//! Reads the task-definitions file and the compose file and exposes shape
//! checks on them. An absent file is a valid, distinct state (`Ok(None)`);
//! a malformed file is a hard failure, never skipped.

use std::path::Path;

use serde_yaml::{Mapping, Value};

use crate::common::{Error, Result};

/// Task names treated as destructive-reset entry points
const RESET_KEYWORDS: [&str; 5] = ["reset", "clean", "prune", "wipe", "destroy"];

/// Read a YAML file into a mapping.
///
/// Absent file → `Ok(None)`. Malformed or non-mapping content →
/// `Error::ConfigParse`. Reading the same unchanged file twice yields equal
/// mappings.
pub fn read_yaml(path: &Path) -> Result<Option<Mapping>> {
    if !path.exists() {
        return Ok(None);
    }

    let text = std::fs::read_to_string(path)?;
    let value: Value =
        serde_yaml::from_str(&text).map_err(|e| Error::config_parse(path, e.to_string()))?;

    match value {
        Value::Mapping(mapping) => Ok(Some(mapping)),
        Value::Null => Err(Error::config_parse(path, "document is empty")),
        _ => Err(Error::config_parse(path, "top level is not a mapping")),
    }
}

fn str_key<'a>(mapping: &'a Mapping, key: &str) -> Option<&'a Value> {
    mapping.get(Value::String(key.to_string()))
}

fn mapping_keys(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Mapping(mapping)) => mapping
            .keys()
            .filter_map(|k| k.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

/// Parsed task-definitions file
#[derive(Debug, Clone)]
pub struct Taskfile {
    mapping: Mapping,
}

impl Taskfile {
    /// Validate the overall shape: a Taskfile carries `tasks` or `version`
    pub fn parse(mapping: Mapping) -> Result<Self> {
        if str_key(&mapping, "tasks").is_none() && str_key(&mapping, "version").is_none() {
            return Err(Error::Config(
                "Taskfile is missing both 'tasks' and 'version' keys".to_string(),
            ));
        }
        Ok(Self { mapping })
    }

    /// Names of all defined tasks
    pub fn task_names(&self) -> Vec<String> {
        mapping_keys(str_key(&self.mapping, "tasks"))
    }

    pub fn has_task(&self, name: &str) -> bool {
        self.task_names().iter().any(|t| t == name)
    }

    /// Whether at least one task carries a `desc` field
    pub fn has_documented_task(&self) -> bool {
        let Some(Value::Mapping(tasks)) = str_key(&self.mapping, "tasks") else {
            return false;
        };
        tasks.values().any(|task| {
            matches!(task, Value::Mapping(def) if str_key(def, "desc").is_some())
        })
    }

    /// Whether a reset-like task exists. A plain `down` task counts: it is
    /// the documented teardown path even when no dedicated reset exists.
    pub fn has_reset_task(&self) -> bool {
        self.task_names().iter().any(|name| {
            let lower = name.to_lowercase();
            lower == "down" || RESET_KEYWORDS.iter().any(|kw| lower.contains(kw))
        })
    }
}

/// Parsed compose file
#[derive(Debug, Clone)]
pub struct ComposeFile {
    mapping: Mapping,
}

impl ComposeFile {
    /// Validate the overall shape: a compose file declares a `services`
    /// mapping
    pub fn parse(mapping: Mapping) -> Result<Self> {
        match str_key(&mapping, "services") {
            Some(Value::Mapping(_)) => Ok(Self { mapping }),
            Some(_) => Err(Error::Config(
                "compose file 'services' is not a mapping".to_string(),
            )),
            None => Err(Error::Config(
                "compose file is missing the 'services' mapping".to_string(),
            )),
        }
    }

    pub fn service_names(&self) -> Vec<String> {
        mapping_keys(str_key(&self.mapping, "services"))
    }

    /// Whether volumes are declared anywhere: top-level or on a service
    pub fn has_volumes(&self) -> bool {
        if str_key(&self.mapping, "volumes").is_some() {
            return true;
        }
        let Some(Value::Mapping(services)) = str_key(&self.mapping, "services") else {
            return false;
        };
        services.values().any(|service| {
            matches!(service, Value::Mapping(def) if str_key(def, "volumes").is_some())
        })
    }

    /// Volume entries that are neither short `src:dst` form nor long form
    /// with `source`/`target`
    pub fn malformed_volume_entries(&self) -> Vec<String> {
        let mut bad = Vec::new();
        let Some(Value::Mapping(services)) = str_key(&self.mapping, "services") else {
            return bad;
        };
        for service in services.values() {
            let Value::Mapping(def) = service else { continue };
            let Some(Value::Sequence(volumes)) = str_key(def, "volumes") else {
                continue;
            };
            for volume in volumes {
                match volume {
                    Value::String(entry) if entry.contains(':') => {}
                    Value::String(entry) => bad.push(entry.clone()),
                    Value::Mapping(long)
                        if str_key(long, "source").is_some()
                            || str_key(long, "target").is_some() => {}
                    other => bad.push(format!("{other:?}")),
                }
            }
        }
        bad
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn mapping(yaml: &str) -> Mapping {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_read_yaml_absent_file_is_none() {
        let dir = tempdir().unwrap();
        let result = read_yaml(&dir.path().join("missing.yml")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_read_yaml_malformed_is_hard_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.yml");
        std::fs::write(&path, "tasks: [unclosed").unwrap();
        assert!(matches!(read_yaml(&path), Err(Error::ConfigParse { .. })));
    }

    #[test]
    fn test_read_yaml_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Taskfile.yml");
        std::fs::write(&path, "version: '3'\ntasks:\n  up:\n    desc: start\n").unwrap();
        let first = read_yaml(&path).unwrap();
        let second = read_yaml(&path).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_taskfile_requires_tasks_or_version() {
        assert!(Taskfile::parse(mapping("version: '3'")).is_ok());
        assert!(Taskfile::parse(mapping("tasks: {}")).is_ok());
        assert!(Taskfile::parse(mapping("other: 1")).is_err());
    }

    #[test]
    fn test_taskfile_task_lookup_and_docs() {
        let taskfile = Taskfile::parse(mapping(
            "version: '3'\ntasks:\n  up:\n    desc: start the stack\n  down:\n    cmds: [docker compose down]\n",
        ))
        .unwrap();
        assert!(taskfile.has_task("up"));
        assert!(taskfile.has_task("down"));
        assert!(!taskfile.has_task("deploy"));
        assert!(taskfile.has_documented_task());
        assert!(taskfile.has_reset_task());
    }

    #[test]
    fn test_taskfile_reset_detection_by_keyword() {
        let taskfile =
            Taskfile::parse(mapping("version: '3'\ntasks:\n  clean-volumes: {}\n")).unwrap();
        assert!(taskfile.has_reset_task());

        let taskfile = Taskfile::parse(mapping("version: '3'\ntasks:\n  up: {}\n")).unwrap();
        assert!(!taskfile.has_reset_task());
    }

    #[test]
    fn test_compose_requires_services_mapping() {
        assert!(ComposeFile::parse(mapping("services:\n  api: {}\n")).is_ok());
        assert!(ComposeFile::parse(mapping("volumes: {}")).is_err());
        assert!(ComposeFile::parse(mapping("services: [a, b]")).is_err());
    }

    #[test]
    fn test_compose_volume_detection() {
        let top_level = ComposeFile::parse(mapping(
            "services:\n  api: {}\nvolumes:\n  data: {}\n",
        ))
        .unwrap();
        assert!(top_level.has_volumes());

        let per_service = ComposeFile::parse(mapping(
            "services:\n  api:\n    volumes:\n      - data:/var/lib/app\n",
        ))
        .unwrap();
        assert!(per_service.has_volumes());

        let none = ComposeFile::parse(mapping("services:\n  api: {}\n")).unwrap();
        assert!(!none.has_volumes());
    }

    #[test]
    fn test_compose_malformed_volume_entries() {
        let compose = ComposeFile::parse(mapping(
            "services:\n  api:\n    volumes:\n      - data:/var/lib/app\n      - justaname\n      - type: volume\n        target: /data\n",
        ))
        .unwrap();
        assert_eq!(compose.malformed_volume_entries(), vec!["justaname"]);
    }
}
