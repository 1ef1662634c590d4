//! Sign-in, sign-up, OTP verification and sign-out.
//!
//! These routes are called anonymously through the gateway so that a rejected
//! password surfaces as `GatewayError::Authorization` without touching the
//! refresh protocol.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::gateway::{Gateway, RequestOptions};

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Registration payload, sent as `{ "user": { ... } }`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Serialize)]
struct SignUpBody<'a> {
    user: &'a NewUser,
}

#[derive(Serialize)]
struct VerifyOtpBody<'a> {
    user: OtpUser<'a>,
    otp: &'a str,
}

#[derive(Serialize)]
struct OtpUser<'a> {
    username: &'a str,
}

// =============================================================================
// CLIENT
// =============================================================================

/// Auth routes bound to a gateway.
pub struct AuthClient<'g> {
    gateway: &'g Gateway,
    config: &'g GatewayConfig,
}

impl<'g> AuthClient<'g> {
    #[must_use]
    pub fn new(gateway: &'g Gateway, config: &'g GatewayConfig) -> Self {
        Self { gateway, config }
    }

    /// Exchange credentials for a token pair and mark the session authenticated.
    ///
    /// # Errors
    ///
    /// `Authorization` for rejected credentials, `Decode` if the response
    /// lacks a token pair, otherwise whatever the gateway surfaced.
    pub async fn sign_in(&self, username: &str, password: &str) -> Result<SignInResponse, GatewayError> {
        let credentials = Credentials { username: username.to_string(), password: password.to_string() };
        let value = self
            .post_anonymous("signin", serde_json::to_value(&credentials)?)
            .await?;
        let response: SignInResponse = serde_json::from_value(value)?;

        let name = response
            .username
            .clone()
            .unwrap_or_else(|| username.to_string());
        self.gateway
            .session()
            .set_authenticated(response.access_token.clone(), response.refresh_token.clone(), name.clone());
        info!(username = %name, "auth: signed in");
        Ok(response)
    }

    /// Register a new account. The backend follows up with an OTP; the
    /// session stays unauthenticated.
    ///
    /// # Errors
    ///
    /// Whatever the gateway surfaced.
    pub async fn sign_up(&self, user: &NewUser) -> Result<Value, GatewayError> {
        let value = self
            .post_anonymous("signup", serde_json::to_value(SignUpBody { user })?)
            .await?;
        info!(username = %user.username, "auth: registered, awaiting otp");
        Ok(value)
    }

    /// Confirm a one-time password and mark the session authenticated.
    ///
    /// # Errors
    ///
    /// `Authorization` for a rejected code, `Decode` if the response lacks a
    /// token pair, otherwise whatever the gateway surfaced.
    pub async fn verify_otp(&self, username: &str, otp: &str) -> Result<SignInResponse, GatewayError> {
        let body = VerifyOtpBody { user: OtpUser { username }, otp };
        let value = self
            .post_anonymous("verify-otp", serde_json::to_value(body)?)
            .await?;
        let response: SignInResponse = serde_json::from_value(value)?;

        self.gateway.session().set_authenticated(
            response.access_token.clone(),
            response.refresh_token.clone(),
            username,
        );
        info!(%username, "auth: otp verified");
        Ok(response)
    }

    /// Local sign-out; there is no server round trip.
    pub fn sign_out(&self) {
        let username = self.gateway.session().username();
        self.gateway.session().clear();
        info!(username = ?username, "auth: signed out");
    }

    async fn post_anonymous(&self, route: &str, body: Value) -> Result<Value, GatewayError> {
        self.gateway
            .request_with(Method::POST, &self.config.auth_path(route), Some(body), RequestOptions::anonymous())
            .await
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
