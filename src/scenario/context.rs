//! Per-scenario shared context
//!
//! When-steps stash what they observed; Then-steps read it back and assert.
//! The context is created fresh for every scenario and discarded at its end,
//! so nothing leaks between scenarios. Missing keys surface as assertion
//! errors naming the step order problem.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::common::{Error, Result};
use crate::exec::ExecutionResult;
use crate::probe::ProbeResponse;

/// Key under which the most recent HTTP response is stored
pub const LAST_RESPONSE: &str = "response";

/// Key under which the most recent command result is stored
pub const LAST_EXEC: &str = "exec";

/// A value captured by a When-step
#[derive(Debug, Clone)]
pub enum Captured {
    Exec(ExecutionResult),
    Response(ProbeResponse),
    Yaml(serde_yaml::Mapping),
    Names(BTreeSet<String>),
    /// Port number → whether something is listening
    Ports(BTreeMap<u16, bool>),
}

/// Scenario-scoped key/value store, passed by reference into each step
#[derive(Debug, Default)]
pub struct ScenarioContext {
    values: HashMap<String, Captured>,
}

impl ScenarioContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Captured) {
        self.values.insert(key.into(), value);
    }

    /// Store a command result under its own key and as the latest one
    pub fn capture_exec(&mut self, key: &str, result: ExecutionResult) {
        self.values
            .insert(key.to_string(), Captured::Exec(result.clone()));
        self.values.insert(LAST_EXEC.to_string(), Captured::Exec(result));
    }

    /// Store an HTTP response as the latest one
    pub fn capture_response(&mut self, response: ProbeResponse) {
        self.values
            .insert(LAST_RESPONSE.to_string(), Captured::Response(response));
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Captured> {
        self.values.get(key)
    }

    fn missing(key: &str) -> Error {
        Error::assertion(format!(
            "'{key}' was not captured; did the matching When-step run?"
        ))
    }

    pub fn exec(&self, key: &str) -> Result<&ExecutionResult> {
        match self.values.get(key) {
            Some(Captured::Exec(result)) => Ok(result),
            _ => Err(Self::missing(key)),
        }
    }

    pub fn response(&self, key: &str) -> Result<&ProbeResponse> {
        match self.values.get(key) {
            Some(Captured::Response(response)) => Ok(response),
            _ => Err(Self::missing(key)),
        }
    }

    pub fn last_response(&self) -> Result<&ProbeResponse> {
        self.response(LAST_RESPONSE)
    }

    pub fn yaml(&self, key: &str) -> Result<&serde_yaml::Mapping> {
        match self.values.get(key) {
            Some(Captured::Yaml(mapping)) => Ok(mapping),
            _ => Err(Self::missing(key)),
        }
    }

    pub fn names(&self, key: &str) -> Result<&BTreeSet<String>> {
        match self.values.get(key) {
            Some(Captured::Names(names)) => Ok(names),
            _ => Err(Self::missing(key)),
        }
    }

    pub fn ports(&self, key: &str) -> Result<&BTreeMap<u16, bool>> {
        match self.values.get(key) {
            Some(Captured::Ports(ports)) => Ok(ports),
            _ => Err(Self::missing(key)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn exec_result() -> ExecutionResult {
        ExecutionResult {
            command: "task up".to_string(),
            exit_code: Some(0),
            stdout: "started".to_string(),
            stderr: String::new(),
            elapsed: Duration::from_secs(1),
        }
    }

    #[test]
    fn test_capture_exec_also_sets_latest() {
        let mut ctx = ScenarioContext::new();
        ctx.capture_exec("task_up", exec_result());
        assert!(ctx.exec("task_up").unwrap().success());
        assert_eq!(ctx.exec(LAST_EXEC).unwrap().command, "task up");
    }

    #[test]
    fn test_missing_key_is_assertion_error() {
        let ctx = ScenarioContext::new();
        let err = ctx.exec("never_stored").unwrap_err();
        assert!(matches!(err, Error::Assertion(_)));
    }

    #[test]
    fn test_wrong_kind_is_assertion_error() {
        let mut ctx = ScenarioContext::new();
        ctx.capture_exec("task_up", exec_result());
        assert!(ctx.response("task_up").is_err());
    }

    #[test]
    fn test_last_response_round_trip() {
        let mut ctx = ScenarioContext::new();
        ctx.capture_response(ProbeResponse {
            status: 200,
            body: "ok".to_string(),
        });
        assert_eq!(ctx.last_response().unwrap().status, 200);
    }
}
