//! Scripted transport shared by unit tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Value, json};

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::gateway::Gateway;
use crate::session::SessionStore;
use crate::transport::{ApiRequest, ApiResponse, HttpTransport};

/// One scripted reply, optionally delayed.
pub struct Reply {
    pub delay: Option<Duration>,
    pub result: Result<ApiResponse, GatewayError>,
}

impl Reply {
    pub fn json(status: u16, body: &Value) -> Self {
        Self { delay: None, result: Ok(ApiResponse::new(status, body.to_string())) }
    }

    pub fn status(status: u16) -> Self {
        Self { delay: None, result: Ok(ApiResponse::new(status, "")) }
    }

    pub fn network(message: &str) -> Self {
        Self { delay: None, result: Err(GatewayError::Network(message.into())) }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

type Handler = dyn Fn(&ApiRequest) -> Reply + Send + Sync;

pub struct MockTransport {
    handler: Box<Handler>,
    log: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub fn new(handler: impl Fn(&ApiRequest) -> Reply + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self { handler: Box::new(handler), log: Mutex::new(Vec::new()) })
    }

    /// Every request seen, in dispatch order.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.log.lock().unwrap().clone()
    }

    pub fn count_path(&self, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.path == path)
            .count()
    }
}

#[async_trait::async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, GatewayError> {
        self.log.lock().unwrap().push(request.clone());
        let reply = (self.handler)(request);
        // Give sibling tasks a chance to dispatch before this one resolves.
        tokio::task::yield_now().await;
        if let Some(delay) = reply.delay {
            tokio::time::sleep(delay).await;
        }
        reply.result
    }
}

pub const REFRESH_PATH: &str = "/auth/refresh-token";

pub fn rotated_pair() -> Value {
    json!({ "accessToken": "T2", "refreshToken": "R2" })
}

/// Store signed in as `alice` with tokens `T1`/`R1`.
pub fn signed_in_store() -> SessionStore {
    let store = SessionStore::new();
    store.set_authenticated("T1", "R1", "alice");
    store
}

pub fn gateway_with(session: SessionStore, transport: Arc<MockTransport>) -> Gateway {
    Gateway::new(session, transport, &GatewayConfig::default())
}
