//! Path discovery for the deployment under test
//!
//! The stack repository is identified by its Taskfile.yml; the compose file
//! may be named either docker-compose.yml or compose.yml.

use std::path::{Path, PathBuf};

use super::{Error, Result};

/// File that marks the root of the stack repository
pub const TASKFILE_NAME: &str = "Taskfile.yml";

/// Compose file names, checked in order
pub const COMPOSE_NAMES: [&str; 2] = ["docker-compose.yml", "compose.yml"];

/// Find the repository root by walking upward looking for Taskfile.yml.
///
/// At most 10 levels are searched. A missing root is a top-level structural
/// failure: nothing in the suite can run without the orchestration files.
pub fn find_repo_root(start: &Path) -> Result<PathBuf> {
    let mut current = start.to_path_buf();
    for _ in 0..10 {
        if current.join(TASKFILE_NAME).exists() {
            return Ok(current);
        }
        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => break,
        }
    }
    Err(Error::RepoRootNotFound(start.display().to_string()))
}

/// Path to the Taskfile in a repository root
pub fn taskfile(root: &Path) -> PathBuf {
    root.join(TASKFILE_NAME)
}

/// Locate the compose file in a repository root, if any
pub fn compose_file(root: &Path) -> Option<PathBuf> {
    COMPOSE_NAMES
        .iter()
        .map(|name| root.join(name))
        .find(|path| path.exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_find_repo_root_direct() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(TASKFILE_NAME), "version: '3'").unwrap();
        let root = find_repo_root(dir.path()).unwrap();
        assert_eq!(root, dir.path());
    }

    #[test]
    fn test_find_repo_root_from_nested_dir() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(TASKFILE_NAME), "version: '3'").unwrap();
        let nested = dir.path().join("tests").join("deep");
        std::fs::create_dir_all(&nested).unwrap();
        let root = find_repo_root(&nested).unwrap();
        assert_eq!(root, dir.path());
    }

    #[test]
    fn test_find_repo_root_missing() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            find_repo_root(dir.path()),
            Err(Error::RepoRootNotFound(_))
        ));
    }

    #[test]
    fn test_compose_file_prefers_docker_compose_yml() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("docker-compose.yml"), "services: {}").unwrap();
        std::fs::write(dir.path().join("compose.yml"), "services: {}").unwrap();
        let found = compose_file(dir.path()).unwrap();
        assert!(found.ends_with("docker-compose.yml"));
    }

    #[test]
    fn test_compose_file_falls_back_to_compose_yml() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("compose.yml"), "services: {}").unwrap();
        let found = compose_file(dir.path()).unwrap();
        assert!(found.ends_with("compose.yml"));
    }
}
