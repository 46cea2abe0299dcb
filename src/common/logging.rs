//! Logging and tracing configuration
//!
//! The harness logs to stdout only; scenario output itself goes through the
//! colored step reporter, so tracing is kept compact and quiet by default.

use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Initialize tracing for the CLI (stdout logging)
///
/// Logs are controlled by the `RUST_LOG` environment variable; `verbose`
/// raises the default for this crate from INFO to DEBUG. Dependencies stay
/// at WARN either way.
pub fn init(verbose: bool) {
    let default = if verbose {
        "stackcheck=debug,warn"
    } else {
        "stackcheck=info,warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}
