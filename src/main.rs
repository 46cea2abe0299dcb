//! stackcheck - deployment verification for the feedback service stack

use clap::Parser;
use stackcheck::commands::Commands;
use stackcheck::{cli, common};

#[derive(Parser)]
#[command(name = "stackcheck", about = "Deployment verification harness")]
#[command(version, long_about = None)]
struct Cli {
    /// Verbose logging (equivalent to RUST_LOG=stackcheck=debug)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    common::logging::init(cli.verbose);

    if let Err(e) = cli::dispatch(cli.command).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
