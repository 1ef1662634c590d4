//! Gateway error taxonomy.
//!
//! Callers of the gateway never see a raw 401. They see data or one of these
//! variants. Only `Authorization` means the session may have been ended.

// =============================================================================
// ERROR
// =============================================================================

/// Errors surfaced to callers of [`crate::Gateway`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// Transport-level failure (timeout, DNS, connection refused). Not retried.
    #[error("network error: {0}")]
    Network(String),

    /// Non-401 HTTP error status. Not retried.
    #[error("server error: status {status}")]
    Server { status: u16, body: String },

    /// A 401 that could not be resolved by a refresh-and-replay cycle.
    #[error("authorization failed: {0}")]
    Authorization(String),

    /// A successful response body was not the expected JSON.
    #[error("response decode failed: {0}")]
    Decode(String),

    /// Invalid configuration or HTTP client construction failure.
    #[error("config error: {0}")]
    Config(String),
}

impl GatewayError {
    /// Stable machine-readable code for logs and CLI output.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Network(_) => "E_NETWORK",
            Self::Server { .. } => "E_SERVER",
            Self::Authorization(_) => "E_AUTHORIZATION",
            Self::Decode(_) => "E_DECODE",
            Self::Config(_) => "E_CONFIG",
        }
    }

    /// Whether the UI should treat this as "you have been signed out".
    #[must_use]
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Authorization(_))
    }

    /// HTTP status carried by the error, when there is one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            Self::Authorization(_) => Some(401),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
