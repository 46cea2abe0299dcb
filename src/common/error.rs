//! Error types for the deployment verification harness
//!
//! The taxonomy distinguishes "infrastructure absent" (dependency or network
//! errors, which the environment gate may convert into skips) from "system
//! present but behaving incorrectly" (assertion errors, which always fail).

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the harness
#[derive(Error, Debug)]
pub enum Error {
    // === Dependency Errors ===
    #[error("{name} is not available: {hint}")]
    DependencyMissing { name: String, hint: String },

    // === Network Errors ===
    #[error("Request to {url} failed: {reason}")]
    Network { url: String, reason: String },

    // === Command Errors ===
    #[error("Command '{command}' failed with exit code {code:?}: {stderr}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Command '{command}' timed out after {seconds} seconds")]
    CommandTimeout { command: String, seconds: u64 },

    #[error("Timed out after {0} seconds")]
    Timeout(u64),

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid YAML in '{path}': {message}")]
    ConfigParse { path: String, message: String },

    #[error("Repository root not found: no Taskfile.yml in '{0}' or any parent directory")]
    RepoRootNotFound(String),

    // === Scenario Errors ===
    #[error("No step definition matches '{0}'")]
    StepNotFound(String),

    #[error("Assertion failed: {0}")]
    Assertion(String),

    #[error("{0} scenario(s) failed")]
    ScenariosFailed(usize),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a dependency-missing error
    pub fn dependency_missing(name: &str, hint: impl Into<String>) -> Self {
        Self::DependencyMissing {
            name: name.to_string(),
            hint: hint.into(),
        }
    }

    /// Create a network error
    pub fn network(url: &str, reason: impl Into<String>) -> Self {
        Self::Network {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    /// Create an assertion error
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::Assertion(message.into())
    }

    /// Create a YAML parse error for a file
    pub fn config_parse(path: &std::path::Path, message: impl Into<String>) -> Self {
        Self::ConfigParse {
            path: path.display().to_string(),
            message: message.into(),
        }
    }

    /// Whether this error describes absent infrastructure rather than a
    /// misbehaving system. Only these are eligible for skip conversion.
    pub fn is_environmental(&self) -> bool {
        matches!(self, Error::DependencyMissing { .. } | Error::Network { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environmental_classification() {
        assert!(Error::dependency_missing("docker", "not on PATH").is_environmental());
        assert!(Error::network("http://localhost:1", "refused").is_environmental());
        assert!(!Error::assertion("status was 500").is_environmental());
        assert!(!Error::ConfigParse {
            path: "x.yml".into(),
            message: "bad".into()
        }
        .is_environmental());
    }
}
