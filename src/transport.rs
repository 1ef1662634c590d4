//! HTTP transport seam.
//!
//! The gateway talks to the network only through [`HttpTransport`], so the
//! refresh protocol can be exercised against a scripted transport in tests.
//! [`ReqwestTransport`] is the production implementation.

use std::time::Duration;

use reqwest::Method;
use serde_json::Value;

use crate::config::GatewayConfig;
use crate::error::GatewayError;

/// One outbound call, fully resolved except for the origin.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the configured base URL, starting with `/`.
    pub path: String,
    pub body: Option<Value>,
    /// Bearer token to attach, if any.
    pub bearer: Option<String>,
}

/// Raw response: status plus undecoded body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self { status, body: body.into() }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }
}

/// Sends a single request. Implementations must not retry or interpret statuses.
///
/// Transport-level failures are reported as [`GatewayError::Network`]; any
/// HTTP status, including 4xx/5xx, is a successful `ApiResponse`.
#[async_trait::async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, GatewayError>;
}

// =============================================================================
// REQWEST
// =============================================================================

pub struct ReqwestTransport {
    http: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    /// Build a transport with the configured timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if the HTTP client fails to build.
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| GatewayError::Config(format!("http client build failed: {e}")))?;
        Ok(Self { http, base_url: config.base_url.clone() })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait::async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, GatewayError> {
        let url = join_url(&self.base_url, &request.path);
        let mut builder = self.http.request(request.method.clone(), url);
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;
        Ok(ApiResponse { status, body })
    }
}

pub(crate) fn join_url(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
#[path = "transport_test.rs"]
mod tests;
