//! CLI command definitions

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run scenario files against the deployed stack
    Run {
        /// Scenario YAML files, or directories to scan for them.
        /// Defaults to the `scenarios/` directory in the repository root.
        paths: Vec<PathBuf>,

        /// Fail instead of skipping when Docker or Task are unavailable
        #[arg(long)]
        require: bool,
    },

    /// Check local prerequisites: docker, task, daemon, orchestration files
    Check,

    /// Wait until every service health endpoint answers
    Wait {
        /// Deadline in seconds
        #[arg(long, default_value = "180")]
        timeout: u64,
    },

    /// Show container and service health status
    Status,

    /// List every step the scenario runner understands
    Steps,
}
