//! The deployment under test: YAML descriptors and orchestration CLIs

pub mod compose;
pub mod descriptor;
pub mod task;

pub use compose::{ComposeEngine, ContainerState, ContainerStatus};
pub use descriptor::{read_yaml, ComposeFile, Taskfile};
pub use task::TaskRunner;
