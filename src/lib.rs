//! # wms-gateway
//!
//! Authenticated HTTP client for the warehouse management backend.
//!
//! Every API call goes through a [`Gateway`], which attaches the bearer token
//! held by the [`SessionStore`] and resolves expired-token 401s with a single
//! shared refresh followed by a replay. When the refresh itself fails the
//! session is cleared and a [`SessionEnded`] signal is broadcast so the
//! surrounding shell can send the user back to sign-in.

pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod resources;
pub mod session;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use auth::{AuthClient, NewUser, SignInResponse};
pub use config::GatewayConfig;
pub use error::GatewayError;
pub use gateway::{Gateway, RequestOptions, SessionEnded, TokenPair};
pub use resources::{Report, Resource, Resources};
pub use reqwest::Method;
pub use session::{Session, SessionEvent, SessionStore, SignOutReason};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, ReqwestTransport};
