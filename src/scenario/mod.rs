//! Scenario model and execution

pub mod config;
pub mod context;
pub mod registry;
pub mod runner;

pub use config::{Isolation, Keyword, ScenarioFile, Step};
pub use context::{Captured, ScenarioContext};
pub use registry::{Arg, Pattern, StepRegistry};
pub use runner::{RunSummary, ScenarioReport, ScenarioRunner, ScenarioStatus};
