//! Deployment verification harness for the feedback service stack
//!
//! Drives the stack's own orchestration (`task`, `docker compose`) and
//! probes its HTTP surfaces, executing Given/When/Then scenarios loaded from
//! YAML files. Missing infrastructure skips scenarios in lenient runs and
//! fails them when strictness is requested.

pub mod cli;
pub mod commands;
pub mod common;
pub mod exec;
pub mod gate;
pub mod harness;
pub mod probe;
pub mod scenario;
pub mod stack;
pub mod steps;

pub use common::{Error, Result};
