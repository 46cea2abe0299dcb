//! Scenario file format
//!
//! A scenario is one ordered sequence of Given/When/Then steps loaded from a
//! YAML file. Step strings start with their keyword; `and`/`but` inherit the
//! keyword of the preceding step.

use std::path::Path;

use serde::Deserialize;

use crate::common::{Error, Result};

/// A complete scenario loaded from a YAML file
#[derive(Deserialize, Debug)]
pub struct ScenarioFile {
    /// Name of the scenario
    pub name: String,
    /// Optional description of what the scenario verifies
    pub description: Option<String>,
    /// Whether the scenario reuses the shared stack or demands a fresh one
    #[serde(default)]
    pub isolation: Isolation,
    /// Ordered step lines, e.g. `when I run "task up" to start all services`
    pub steps: Vec<String>,
}

/// Stack lifetime for a scenario
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Isolation {
    /// Start the stack once for the whole run and reuse it
    #[default]
    Shared,
    /// Tear the stack down before and after this scenario
    Fresh,
}

/// Step keyword after `and`/`but` resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Given,
    When,
    Then,
}

impl Keyword {
    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Given => "given",
            Keyword::When => "when",
            Keyword::Then => "then",
        }
    }
}

/// One resolved step: keyword plus the text matched against the registry
#[derive(Debug, Clone)]
pub struct Step {
    pub keyword: Keyword,
    pub text: String,
}

impl ScenarioFile {
    /// Load a scenario from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read scenario '{}': {}",
                path.display(),
                e
            ))
        })?;
        serde_yaml::from_str(&content).map_err(|e| Error::config_parse(path, e.to_string()))
    }

    /// Split each step line into keyword and text, resolving `and`/`but`
    pub fn parsed_steps(&self) -> Result<Vec<Step>> {
        let mut steps = Vec::with_capacity(self.steps.len());
        let mut previous: Option<Keyword> = None;

        for line in &self.steps {
            let trimmed = line.trim();
            let (head, rest) = trimmed.split_once(char::is_whitespace).ok_or_else(|| {
                Error::Config(format!("Step '{trimmed}' has no keyword"))
            })?;

            let keyword = match head.to_lowercase().as_str() {
                "given" => Keyword::Given,
                "when" => Keyword::When,
                "then" => Keyword::Then,
                "and" | "but" => previous.ok_or_else(|| {
                    Error::Config(format!(
                        "Step '{trimmed}' continues a previous step, but none precedes it"
                    ))
                })?,
                other => {
                    return Err(Error::Config(format!(
                        "Unknown step keyword '{other}' in '{trimmed}'"
                    )))
                }
            };

            previous = Some(keyword);
            steps.push(Step {
                keyword,
                text: rest.trim().to_string(),
            });
        }

        Ok(steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario(steps: &[&str]) -> ScenarioFile {
        ScenarioFile {
            name: "test".to_string(),
            description: None,
            isolation: Isolation::Shared,
            steps: steps.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_keywords_are_parsed_in_order() {
        let steps = scenario(&[
            "given services are running",
            "when I request the health endpoint",
            "then the response status is 200",
        ])
        .parsed_steps()
        .unwrap();

        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0].keyword, Keyword::Given);
        assert_eq!(steps[1].keyword, Keyword::When);
        assert_eq!(steps[2].keyword, Keyword::Then);
        assert_eq!(steps[1].text, "I request the health endpoint");
    }

    #[test]
    fn test_and_inherits_previous_keyword() {
        let steps = scenario(&[
            "then the response status is 200",
            "and the response indicates healthy status",
        ])
        .parsed_steps()
        .unwrap();
        assert_eq!(steps[1].keyword, Keyword::Then);
    }

    #[test]
    fn test_leading_and_is_rejected() {
        let err = scenario(&["and something"]).parsed_steps().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_unknown_keyword_is_rejected() {
        let err = scenario(&["whenever pigs fly"]).parsed_steps().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_yaml_deserialization_defaults() {
        let file: ScenarioFile = serde_yaml::from_str(
            "name: demo\nsteps:\n  - given services are running\n",
        )
        .unwrap();
        assert_eq!(file.isolation, Isolation::Shared);

        let fresh: ScenarioFile = serde_yaml::from_str(
            "name: demo\nisolation: fresh\nsteps: []\n",
        )
        .unwrap();
        assert_eq!(fresh.isolation, Isolation::Fresh);
    }
}
