//! HTTP transport to the remote query endpoint

use std::time::Duration;

use reqwest::StatusCode;
use tracing::debug;

use super::request::RemoteQueryRequest;
use crate::auth::{AuthMethod, Endpoint};
use crate::config::EndpointConfig;
use querybot_common::{QueryBotError, Result};

/// Raw reply from the endpoint
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: String,
}

/// Transport-level failure (no HTTP status was received)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    Timeout(Duration),
    Unreachable(String),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::Timeout(d) => write!(f, "timed out after {}s", d.as_secs_f64()),
            TransportError::Unreachable(msg) => write!(f, "unreachable: {}", msg),
        }
    }
}

/// Shared client for one endpoint
#[derive(Debug, Clone)]
pub struct RemoteClient {
    http: reqwest::Client,
    endpoint: Endpoint,
}

impl RemoteClient {
    pub fn new(config: &EndpointConfig) -> Result<Self> {
        let endpoint = Endpoint::from_config(config)?;
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| QueryBotError::ConfigError(format!("HTTP client: {}", e)))?;
        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// POST `request` using `method`, bounded by `timeout`
    pub async fn send(
        &self,
        method: &AuthMethod,
        request: &RemoteQueryRequest,
        timeout: Duration,
    ) -> std::result::Result<RawResponse, TransportError> {
        let url = method.target_url(&self.endpoint);
        let mut builder = self
            .http
            .post(url)
            .timeout(timeout)
            .json(&request.payload());
        if let Some((name, value)) = method.header() {
            builder = builder.header(name, value);
        }

        debug!(kind = request.kind(), auth = %method.kind(), "Sending remote request");

        let response = builder.send().await.map_err(|e| classify_transport(e, timeout))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| classify_transport(e, timeout))?;

        Ok(RawResponse { status, body })
    }
}

fn classify_transport(err: reqwest::Error, timeout: Duration) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(timeout)
    } else {
        // reqwest errors can embed the full URL; strip it so credentials stay out of messages
        TransportError::Unreachable(err.without_url().to_string())
    }
}
