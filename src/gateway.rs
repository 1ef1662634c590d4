//! Authenticated request gateway.
//!
//! DESIGN
//! ======
//! Every outbound API call goes through [`Gateway::request`]. The gateway
//! attaches the current bearer token, passes non-401 responses straight back,
//! and resolves a 401 with at most one refresh-and-replay cycle.
//!
//! REFRESH COORDINATION
//! ====================
//! `RefreshState` holds the in-flight flag and the queue of waiting callers
//! under one mutex. The first caller to see a 401 flips the flag and spawns the
//! refresh; everyone else, the initiator included, parks a oneshot receiver
//! in the queue. The refresh task commits the rotated tokens before draining
//! the queue, so every replay carries the new token. On failure it empties
//! the store before clearing the flag, so a late 401 gives up instead of
//! refreshing again with the rejected token.
//!
//! The lock is never held across an `.await`. Running the refresh on its own
//! task means a caller dropped mid-refresh cannot leave the queue stranded.
//!
//! TRADE-OFFS
//! ==========
//! A 401 for a request that was sent with a token that has since been rotated
//! is replayed directly instead of triggering another refresh. This keeps a
//! slow response from burning the freshly rotated refresh token.

use std::sync::{Arc, Mutex, PoisonError};

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::session::{SessionStore, SignOutReason};
use crate::transport::{ApiRequest, ApiResponse, HttpTransport, ReqwestTransport};

const SESSION_ENDED_CAPACITY: usize = 8;

// =============================================================================
// PUBLIC TYPES
// =============================================================================

/// Per-call options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Send without a bearer token and never enter the refresh protocol.
    pub anonymous: bool,
}

impl RequestOptions {
    #[must_use]
    pub fn anonymous() -> Self {
        Self { anonymous: true }
    }
}

/// Emitted once per unrecoverable refresh failure. The shell should route to sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEnded {
    pub reason: String,
}

/// Token pair returned by the refresh endpoint.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

// =============================================================================
// REFRESH STATE
// =============================================================================

#[derive(Debug, Clone)]
enum RefreshOutcome {
    Rotated,
    Failed(String),
}

#[derive(Default)]
struct RefreshState {
    in_flight: bool,
    waiters: Vec<oneshot::Sender<RefreshOutcome>>,
}

/// What a 401'd caller should do next.
enum Recovery {
    Wait(oneshot::Receiver<RefreshOutcome>),
    Replay,
    GiveUp(String),
}

// =============================================================================
// GATEWAY
// =============================================================================

#[derive(Clone)]
pub struct Gateway {
    session: SessionStore,
    transport: Arc<dyn HttpTransport>,
    refresh_path: String,
    refresh: Arc<Mutex<RefreshState>>,
    ended: broadcast::Sender<SessionEnded>,
}

impl Gateway {
    /// Build a gateway over an explicit transport.
    #[must_use]
    pub fn new(session: SessionStore, transport: Arc<dyn HttpTransport>, config: &GatewayConfig) -> Self {
        let (ended, _) = broadcast::channel(SESSION_ENDED_CAPACITY);
        Self {
            session,
            transport,
            refresh_path: config.auth_path("refresh-token"),
            refresh: Arc::new(Mutex::new(RefreshState::default())),
            ended,
        }
    }

    /// Build a gateway backed by `reqwest`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if the HTTP client fails to build.
    pub fn from_config(session: SessionStore, config: &GatewayConfig) -> Result<Self, GatewayError> {
        let transport = ReqwestTransport::new(config)?;
        Ok(Self::new(session, Arc::new(transport), config))
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Subscribe to the "session ended" signal.
    #[must_use]
    pub fn session_ended(&self) -> broadcast::Receiver<SessionEnded> {
        self.ended.subscribe()
    }

    /// Whether a refresh call is currently outstanding.
    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.lock_refresh().in_flight
    }

    /// Issue an authenticated request and return the decoded JSON body.
    ///
    /// Empty bodies decode as `Value::Null`; non-JSON bodies come back as
    /// `Value::String`.
    ///
    /// # Errors
    ///
    /// `Network` and `Server` errors pass through unchanged. `Authorization`
    /// means the 401 could not be resolved by one refresh-and-replay.
    pub async fn request(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, GatewayError> {
        self.request_with(method, path, body, RequestOptions::default())
            .await
    }

    /// [`Gateway::request`] with explicit [`RequestOptions`].
    ///
    /// # Errors
    ///
    /// See [`Gateway::request`].
    pub async fn request_with(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        options: RequestOptions,
    ) -> Result<Value, GatewayError> {
        let request_id = Uuid::new_v4();
        let mut request = ApiRequest {
            method,
            path: path.to_string(),
            body,
            bearer: if options.anonymous { None } else { self.session.access_token() },
        };

        let response = self.dispatch(request_id, &request).await?;
        if !response.is_unauthorized() {
            return into_result(response);
        }
        if options.anonymous {
            return Err(GatewayError::Authorization(unauthorized_message(&response)));
        }

        self.recover(request_id, request.bearer.as_deref())
            .await?;

        // Single replay; a second 401 is final.
        request.bearer = self.session.access_token();
        let response = self.dispatch(request_id, &request).await?;
        if response.is_unauthorized() {
            warn!(%request_id, path = %request.path, "gateway: still unauthorized after refresh");
            return Err(GatewayError::Authorization("request still unauthorized after token refresh".into()));
        }
        into_result(response)
    }

    /// `GET` and decode into `T`.
    ///
    /// # Errors
    ///
    /// See [`Gateway::request`]; also `Decode` if the body does not match `T`.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, GatewayError> {
        let value = self.request(Method::GET, path, None).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// `POST` a JSON body and decode the response into `T`.
    ///
    /// # Errors
    ///
    /// See [`Gateway::get`].
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T, GatewayError> {
        let value = self
            .request(Method::POST, path, Some(serde_json::to_value(body)?))
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// `PATCH` a JSON body and decode the response into `T`.
    ///
    /// # Errors
    ///
    /// See [`Gateway::get`].
    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T, GatewayError> {
        let value = self
            .request(Method::PATCH, path, Some(serde_json::to_value(body)?))
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// `DELETE` and decode the response into `T`.
    ///
    /// # Errors
    ///
    /// See [`Gateway::get`].
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, GatewayError> {
        let value = self.request(Method::DELETE, path, None).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn dispatch(&self, request_id: Uuid, request: &ApiRequest) -> Result<ApiResponse, GatewayError> {
        debug!(
            %request_id,
            method = %request.method,
            path = %request.path,
            authenticated = request.bearer.is_some(),
            "gateway: dispatch"
        );
        let response = self.transport.send(request).await;
        match &response {
            Ok(r) => debug!(%request_id, status = r.status, "gateway: response"),
            Err(e) => warn!(%request_id, path = %request.path, error = %e, "gateway: transport failed"),
        }
        response
    }

    // =========================================================================
    // REFRESH PROTOCOL
    // =========================================================================

    /// Resolve a 401 for a request sent with `sent_with`. `Ok` means replay.
    async fn recover(&self, request_id: Uuid, sent_with: Option<&str>) -> Result<(), GatewayError> {
        let recovery = self.plan_recovery(request_id, sent_with);
        let rx = match recovery {
            Recovery::Wait(rx) => rx,
            Recovery::Replay => return Ok(()),
            Recovery::GiveUp(reason) => return Err(GatewayError::Authorization(reason)),
        };

        match rx.await {
            Ok(RefreshOutcome::Rotated) => Ok(()),
            Ok(RefreshOutcome::Failed(reason)) => Err(GatewayError::Authorization(reason)),
            Err(_) => Err(GatewayError::Authorization("token refresh was abandoned".into())),
        }
    }

    fn plan_recovery(&self, request_id: Uuid, sent_with: Option<&str>) -> Recovery {
        let mut state = self.lock_refresh();

        if state.in_flight {
            let (tx, rx) = oneshot::channel();
            state.waiters.push(tx);
            debug!(%request_id, queued = state.waiters.len(), "gateway: waiting on in-flight refresh");
            return Recovery::Wait(rx);
        }

        let current = self.session.access_token();
        if current.is_some() && current.as_deref() != sent_with {
            debug!(%request_id, "gateway: token rotated since dispatch, replaying");
            return Recovery::Replay;
        }

        let Some(refresh_token) = self.session.refresh_token() else {
            return Recovery::GiveUp("no refresh token available".into());
        };

        let (tx, rx) = oneshot::channel();
        state.in_flight = true;
        state.waiters.push(tx);
        drop(state);

        info!(%request_id, "gateway: starting token refresh");
        let gateway = self.clone();
        tokio::spawn(async move { gateway.run_refresh(refresh_token).await });
        Recovery::Wait(rx)
    }

    async fn run_refresh(self, refresh_token: String) {
        let request = ApiRequest {
            method: Method::POST,
            path: self.refresh_path.clone(),
            body: Some(json!({ "refreshToken": refresh_token })),
            bearer: None,
        };

        let outcome = match self.transport.send(&request).await {
            Ok(response) if response.is_success() => match serde_json::from_str::<TokenPair>(&response.body) {
                Ok(pair) => {
                    self.session
                        .rotate_tokens(pair.access_token, pair.refresh_token);
                    RefreshOutcome::Rotated
                }
                Err(e) => RefreshOutcome::Failed(format!("refresh response invalid: {e}")),
            },
            Ok(response) => RefreshOutcome::Failed(format!("refresh rejected with status {}", response.status)),
            Err(e) => RefreshOutcome::Failed(format!("refresh failed: {e}")),
        };

        // The store must be empty before the flag drops, or a late 401 would
        // start a second refresh with the rejected token.
        if matches!(outcome, RefreshOutcome::Failed(_)) {
            self.session
                .clear_with(SignOutReason::RefreshFailed);
        }

        let waiters = {
            let mut state = self.lock_refresh();
            state.in_flight = false;
            std::mem::take(&mut state.waiters)
        };

        match &outcome {
            RefreshOutcome::Rotated => info!(waiters = waiters.len(), "gateway: token refresh succeeded"),
            RefreshOutcome::Failed(reason) => {
                warn!(waiters = waiters.len(), %reason, "gateway: token refresh failed, session ended");
                let _ = self
                    .ended
                    .send(SessionEnded { reason: reason.clone() });
            }
        }

        for waiter in waiters {
            // Receiver gone means the caller was dropped.
            let _ = waiter.send(outcome.clone());
        }
    }

    fn lock_refresh(&self) -> std::sync::MutexGuard<'_, RefreshState> {
        self.refresh
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("session", &self.session)
            .field("refresh_path", &self.refresh_path)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// RESPONSE DECODING
// =============================================================================

fn into_result(response: ApiResponse) -> Result<Value, GatewayError> {
    if !response.is_success() {
        return Err(GatewayError::Server { status: response.status, body: response.body });
    }
    Ok(decode_body(&response.body))
}

pub(crate) fn decode_body(body: &str) -> Value {
    if body.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}

fn unauthorized_message(response: &ApiResponse) -> String {
    if response.body.trim().is_empty() {
        "credentials rejected".to_string()
    } else {
        format!("credentials rejected: {}", response.body.trim())
    }
}

#[cfg(test)]
#[path = "gateway_test.rs"]
mod tests;
