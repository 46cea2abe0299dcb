//! HTTP probing and health polling

mod http;
mod waiter;

pub use http::{HttpProbe, ProbeMode, ProbeResponse};
pub use waiter::{snapshot, wait_all, Endpoint, HealthSnapshot, DEFAULT_POLL_INTERVAL, PROBE_TIMEOUT};
