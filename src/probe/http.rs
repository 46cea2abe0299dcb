//! HTTP GET probe with named acceptance modes
//!
//! Different endpoints tolerate different status sets: a dev server serving
//! cached static content answers 304, and the API server's bare root answers
//! 404 while being perfectly alive. The mode is declared per endpoint rather
//! than inferred from its name.

use std::time::Duration;

use serde::Deserialize;

use crate::common::{Error, Result};

/// Which status codes a probe accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeMode {
    /// Exactly 200; for endpoints whose body will be asserted on
    Strict,
    /// 200 or 304; for content served by the dev servers
    #[default]
    Content,
    /// 200, 304 or 404; the endpoint only has to answer at all
    Liveness,
}

impl ProbeMode {
    pub fn accepts(self, status: u16) -> bool {
        match self {
            ProbeMode::Strict => status == 200,
            ProbeMode::Content => matches!(status, 200 | 304),
            ProbeMode::Liveness => matches!(status, 200 | 304 | 404),
        }
    }
}

/// A completed probe: status code plus body text
#[derive(Debug, Clone)]
pub struct ProbeResponse {
    pub status: u16,
    pub body: String,
}

impl ProbeResponse {
    /// Parse the body as JSON
    pub fn json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Whether the body looks like an HTML document
    pub fn is_html(&self) -> bool {
        let lower = self.body.to_lowercase();
        lower.contains("<!doctype html>") || lower.contains("<html")
    }
}

/// Issues plain GET requests against service URLs
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// GET a URL with a per-call timeout.
    ///
    /// Connection refusal and timeouts surface as `Error::Network`; any
    /// answered request, whatever the status code, is an Ok response.
    pub async fn get(&self, url: &str, timeout: Duration) -> Result<ProbeResponse> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| Error::network(url, e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| Error::network(url, e.to_string()))?;

        Ok(ProbeResponse { status, body })
    }
}
