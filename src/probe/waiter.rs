//! Health polling across the whole service set
//!
//! Success requires every endpoint to answer acceptably within the same
//! iteration; a flaky endpoint that passed an earlier round counts for
//! nothing. The poll interval is fixed, no backoff.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use futures_util::future::join_all;

use super::{HttpProbe, ProbeMode};

/// Fixed delay between poll iterations
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Per-request timeout used while polling
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// A named endpoint with its acceptance mode
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub name: String,
    pub url: String,
    pub mode: ProbeMode,
}

/// Reachability of every endpoint in one poll iteration
pub type HealthSnapshot = BTreeMap<String, bool>;

/// Probe every endpoint once, concurrently
pub async fn snapshot(probe: &HttpProbe, endpoints: &[Endpoint]) -> HealthSnapshot {
    let checks = endpoints.iter().map(|endpoint| async move {
        let healthy = match probe.get(&endpoint.url, PROBE_TIMEOUT).await {
            Ok(response) => endpoint.mode.accepts(response.status),
            Err(_) => false,
        };
        (endpoint.name.clone(), healthy)
    });
    join_all(checks).await.into_iter().collect()
}

/// Poll until every endpoint is healthy in the same iteration, or the
/// deadline elapses. Returns false on deadline; never errors.
pub async fn wait_all(
    probe: &HttpProbe,
    endpoints: &[Endpoint],
    timeout: Duration,
    poll_interval: Duration,
) -> bool {
    let deadline = Instant::now() + timeout;

    loop {
        let health = snapshot(probe, endpoints).await;
        if health.values().all(|healthy| *healthy) {
            return true;
        }

        let unhealthy: Vec<&str> = health
            .iter()
            .filter(|(_, healthy)| !**healthy)
            .map(|(name, _)| name.as_str())
            .collect();
        tracing::debug!(?unhealthy, "stack not healthy yet");

        if Instant::now() + poll_interval >= deadline {
            return false;
        }
        tokio::time::sleep(poll_interval).await;
    }
}
