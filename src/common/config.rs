//! Harness configuration and the service registry
//!
//! The registry maps service names to their base and health URLs. It is
//! loaded once at startup and immutable afterwards; built-in defaults mirror
//! the feedback stack and can be overridden from a `stackcheck.yml` file in
//! the repository root.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::probe::{Endpoint, ProbeMode, DEFAULT_POLL_INTERVAL};

use super::{paths, Error, Result};

/// Environment variable selecting strict (fail) vs lenient (skip) behavior
/// when a dependency is missing
pub const REQUIRE_ENV: &str = "STACKCHECK_REQUIRE";

/// Optional override file in the repository root
pub const CONFIG_FILE: &str = "stackcheck.yml";

/// Default prefix identifying project-owned volumes. This must
/// substring-match the stack's actual volume names, which the compose
/// project names `react-feedback-*`.
const DEFAULT_VOLUME_PREFIX: &str = "react-feedback";

/// One entry in the service registry
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceEntry {
    /// Base URL of the service
    pub base_url: String,
    /// Health URL; defaults to the base URL when the service has no
    /// dedicated health path
    #[serde(default)]
    pub health_url: Option<String>,
    /// Probe mode for the bare root of the service. The API server answers
    /// 404 on its root, so its liveness check must tolerate that.
    #[serde(default)]
    pub root_mode: ProbeMode,
}

impl ServiceEntry {
    fn new(base_url: &str, health_url: Option<&str>, root_mode: ProbeMode) -> Self {
        Self {
            base_url: base_url.to_string(),
            health_url: health_url.map(str::to_string),
            root_mode,
        }
    }

    /// Effective health URL
    pub fn health_url(&self) -> &str {
        self.health_url.as_deref().unwrap_or(&self.base_url)
    }

    /// TCP port of the base URL, if one is present
    pub fn port(&self) -> Option<u16> {
        let (_, tail) = self.base_url.rsplit_once(':')?;
        let digits: String = tail.chars().take_while(|c| c.is_ascii_digit()).collect();
        digits.parse().ok()
    }
}

/// Read-only mapping from service name to its URLs
#[derive(Debug, Clone)]
pub struct ServiceRegistry {
    services: BTreeMap<String, ServiceEntry>,
}

impl ServiceRegistry {
    /// Built-in registry for the feedback stack
    pub fn defaults() -> Self {
        let mut services = BTreeMap::new();
        services.insert(
            "feedback-server".to_string(),
            ServiceEntry::new(
                "http://localhost:3001",
                Some("http://localhost:3001/api/v1/health"),
                ProbeMode::Liveness,
            ),
        );
        services.insert(
            "webui".to_string(),
            ServiceEntry::new("http://localhost:5173", None, ProbeMode::Content),
        );
        services.insert(
            "feedback-example".to_string(),
            ServiceEntry::new("http://localhost:3002", None, ProbeMode::Content),
        );
        Self { services }
    }

    pub fn get(&self, name: &str) -> Option<&ServiceEntry> {
        self.services.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ServiceEntry)> {
        self.services.iter()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Health endpoints for the waiter. Cached static responses (304) are
    /// accepted everywhere, matching what the dev servers actually return.
    pub fn health_endpoints(&self) -> Vec<Endpoint> {
        self.services
            .iter()
            .map(|(name, entry)| Endpoint {
                name: name.clone(),
                url: entry.health_url().to_string(),
                mode: ProbeMode::Content,
            })
            .collect()
    }

    /// Service ports declared in the registry
    pub fn ports(&self) -> Vec<u16> {
        self.services.values().filter_map(ServiceEntry::port).collect()
    }
}

/// Shape of the optional stackcheck.yml override file
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    services: Option<BTreeMap<String, ServiceEntry>>,
    #[serde(default)]
    volume_prefix: Option<String>,
    #[serde(default)]
    startup_timeout_secs: Option<u64>,
    #[serde(default)]
    poll_interval_secs: Option<u64>,
}

/// Process-wide harness configuration, immutable after load
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Root of the stack repository (contains Taskfile.yml)
    pub repo_root: PathBuf,
    /// Service registry
    pub registry: ServiceRegistry,
    /// Strict mode: fail instead of skip when dependencies are missing
    pub require: bool,
    /// Prefix identifying project-owned volumes
    pub volume_prefix: String,
    /// Deadline for services to become healthy after startup
    pub startup_timeout: Duration,
    /// Fixed interval between health polls
    pub poll_interval: Duration,
}

impl HarnessConfig {
    /// Load configuration starting from `start_dir`.
    ///
    /// `require_flag` overrides the `STACKCHECK_REQUIRE` environment
    /// variable when set.
    pub fn load(start_dir: &Path, require_flag: Option<bool>) -> Result<Self> {
        let repo_root = paths::find_repo_root(start_dir)?;
        let file = Self::read_override(&repo_root.join(CONFIG_FILE))?;

        let registry = match file.services {
            Some(services) if !services.is_empty() => ServiceRegistry { services },
            _ => ServiceRegistry::defaults(),
        };

        Ok(Self {
            repo_root,
            registry,
            require: require_flag.unwrap_or_else(require_from_env),
            volume_prefix: file
                .volume_prefix
                .unwrap_or_else(|| DEFAULT_VOLUME_PREFIX.to_string()),
            startup_timeout: Duration::from_secs(file.startup_timeout_secs.unwrap_or(180)),
            poll_interval: file
                .poll_interval_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_POLL_INTERVAL),
        })
    }

    fn read_override(path: &Path) -> Result<FileConfig> {
        if !path.exists() {
            return Ok(FileConfig::default());
        }
        let text = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&text).map_err(|e| Error::config_parse(path, e.to_string()))
    }
}

/// Parse the strictness flag from the environment
pub fn require_from_env() -> bool {
    match std::env::var(REQUIRE_ENV) {
        Ok(value) => matches!(
            value.to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_registry_shape() {
        let registry = ServiceRegistry::defaults();
        assert_eq!(registry.len(), 3);
        let server = registry.get("feedback-server").unwrap();
        assert_eq!(server.health_url(), "http://localhost:3001/api/v1/health");
        assert_eq!(server.port(), Some(3001));
        assert_eq!(server.root_mode, ProbeMode::Liveness);

        let webui = registry.get("webui").unwrap();
        assert_eq!(webui.health_url(), "http://localhost:5173");
        assert_eq!(webui.port(), Some(5173));
    }

    #[test]
    fn test_health_endpoints_cover_all_services() {
        let registry = ServiceRegistry::defaults();
        let endpoints = registry.health_endpoints();
        assert_eq!(endpoints.len(), 3);
        assert!(endpoints.iter().all(|e| e.mode == ProbeMode::Content));
    }

    #[test]
    fn test_load_with_defaults() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("Taskfile.yml"), "version: '3'").unwrap();
        let config = HarnessConfig::load(dir.path(), Some(true)).unwrap();
        assert!(config.require);
        assert_eq!(config.registry.len(), 3);
        assert_eq!(config.startup_timeout, Duration::from_secs(180));
        assert_eq!(config.poll_interval, DEFAULT_POLL_INTERVAL);
        // The filter must prefix-match the stack's real volume names
        assert_eq!(config.volume_prefix, "react-feedback");
    }

    #[test]
    fn test_load_with_override_file() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("Taskfile.yml"), "version: '3'").unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "volume_prefix: demo\nservices:\n  api:\n    base_url: http://localhost:9000\n",
        )
        .unwrap();
        let config = HarnessConfig::load(dir.path(), Some(false)).unwrap();
        assert_eq!(config.volume_prefix, "demo");
        assert_eq!(config.registry.len(), 1);
        assert_eq!(config.registry.get("api").unwrap().port(), Some(9000));
    }

    #[test]
    fn test_load_rejects_malformed_override() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("Taskfile.yml"), "version: '3'").unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "services: [not: a: mapping").unwrap();
        assert!(matches!(
            HarnessConfig::load(dir.path(), None),
            Err(Error::ConfigParse { .. })
        ));
    }
}
