//! Common utilities shared across the harness
//!
//! - `error`: error types and Result alias
//! - `config`: service registry and harness configuration
//! - `logging`: tracing setup
//! - `paths`: repository root and compose file discovery

pub mod config;
pub mod error;
pub mod logging;
pub mod paths;

pub use config::{HarnessConfig, ServiceEntry, ServiceRegistry};
pub use error::{Error, Result};
