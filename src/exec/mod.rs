//! External command execution

mod runner;

pub use runner::{CommandRunner, ExecutionResult};
