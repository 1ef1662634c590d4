//! Gateway configuration parsed from environment variables.

use crate::error::GatewayError;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_AUTH_PREFIX: &str = "/auth";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Backend origin, without a trailing slash.
    pub base_url: String,
    /// Path prefix of the auth routes (`signin`, `refresh-token`, ...).
    pub auth_prefix: String,
    pub timeouts: HttpTimeouts,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            auth_prefix: DEFAULT_AUTH_PREFIX.to_string(),
            timeouts: HttpTimeouts::default(),
        }
    }
}

impl GatewayConfig {
    /// Build typed gateway config from environment variables.
    ///
    /// Optional:
    /// - `WMS_API_BASE_URL`: default `http://localhost:3000`
    /// - `WMS_AUTH_PREFIX`: default `/auth`
    /// - `WMS_REQUEST_TIMEOUT_SECS`: default 30
    /// - `WMS_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if the base URL is not http(s).
    pub fn from_env() -> Result<Self, GatewayError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`GatewayConfig::from_env`] but reads values through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if the base URL is not http(s).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, GatewayError> {
        let base_url = normalize_base_url(
            lookup("WMS_API_BASE_URL")
                .as_deref()
                .unwrap_or(DEFAULT_API_BASE_URL),
        )?;
        let auth_prefix = normalize_prefix(
            lookup("WMS_AUTH_PREFIX")
                .as_deref()
                .unwrap_or(DEFAULT_AUTH_PREFIX),
        );
        let timeouts = HttpTimeouts {
            request_secs: parse_u64(lookup("WMS_REQUEST_TIMEOUT_SECS"), DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: parse_u64(lookup("WMS_CONNECT_TIMEOUT_SECS"), DEFAULT_CONNECT_TIMEOUT_SECS),
        };

        Ok(Self { base_url, auth_prefix, timeouts })
    }

    /// Absolute path of an auth route, e.g. `auth_path("signin")` -> `/auth/signin`.
    #[must_use]
    pub fn auth_path(&self, route: &str) -> String {
        format!("{}/{}", self.auth_prefix, route.trim_start_matches('/'))
    }
}

fn parse_u64(raw: Option<String>, default: u64) -> u64 {
    raw.and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

/// Trim trailing slashes and reject anything that is not an http(s) origin.
pub(crate) fn normalize_base_url(raw: &str) -> Result<String, GatewayError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let valid = ["http://", "https://"]
        .iter()
        .any(|scheme| trimmed.strip_prefix(scheme).is_some_and(|rest| !rest.is_empty()));
    if !valid {
        return Err(GatewayError::Config(format!("invalid base URL: {raw}")));
    }
    Ok(trimmed.to_string())
}

fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
