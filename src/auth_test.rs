use serde_json::json;

use super::*;
use crate::session::{Session, SessionEvent, SessionStore};
use crate::test_helpers::{MockTransport, REFRESH_PATH, Reply, gateway_with, signed_in_store};

// =============================================================================
// sign_in
// =============================================================================

#[tokio::test]
async fn sign_in_populates_session() {
    let transport = MockTransport::new(|_| {
        Reply::json(200, &json!({ "accessToken": "T1", "refreshToken": "R1", "username": "alice" }))
    });
    let store = SessionStore::new();
    let gateway = gateway_with(store.clone(), transport.clone());
    let config = GatewayConfig::default();
    let mut events = store.subscribe();

    AuthClient::new(&gateway, &config)
        .sign_in("alice", "hunter2")
        .await
        .unwrap();

    assert_eq!(
        store.snapshot(),
        Session {
            access_token: Some("T1".into()),
            refresh_token: Some("R1".into()),
            username: Some("alice".into()),
            is_authenticated: true,
        }
    );
    assert_eq!(events.try_recv().unwrap(), SessionEvent::SignedIn { username: "alice".into() });

    let sent = &transport.requests()[0];
    assert_eq!(sent.path, "/auth/signin");
    assert_eq!(sent.bearer, None);
    assert_eq!(sent.body, Some(json!({ "username": "alice", "password": "hunter2" })));
}

#[tokio::test]
async fn sign_in_falls_back_to_submitted_username() {
    let transport = MockTransport::new(|_| Reply::json(200, &json!({ "accessToken": "T1", "refreshToken": "R1" })));
    let store = SessionStore::new();
    let gateway = gateway_with(store.clone(), transport);
    let config = GatewayConfig::default();

    AuthClient::new(&gateway, &config)
        .sign_in("bob", "pw")
        .await
        .unwrap();

    assert_eq!(store.username().as_deref(), Some("bob"));
}

#[tokio::test]
async fn rejected_sign_in_leaves_session_empty() {
    let transport = MockTransport::new(|_| Reply::status(401));
    let store = SessionStore::new();
    let gateway = gateway_with(store.clone(), transport.clone());
    let config = GatewayConfig::default();

    let err = AuthClient::new(&gateway, &config)
        .sign_in("alice", "wrong")
        .await
        .unwrap_err();

    assert!(err.is_auth_failure());
    assert!(!store.is_authenticated());
    assert_eq!(transport.count_path(REFRESH_PATH), 0);
}

#[tokio::test]
async fn sign_in_without_tokens_is_decode_error() {
    let transport = MockTransport::new(|_| Reply::json(200, &json!({ "success": true })));
    let store = SessionStore::new();
    let gateway = gateway_with(store.clone(), transport);
    let config = GatewayConfig::default();

    let err = AuthClient::new(&gateway, &config)
        .sign_in("alice", "pw")
        .await
        .unwrap_err();

    assert_eq!(err.error_code(), "E_DECODE");
    assert!(!store.is_authenticated());
}

// =============================================================================
// sign_up / verify_otp
// =============================================================================

#[tokio::test]
async fn sign_up_wraps_user_and_stays_signed_out() {
    let transport = MockTransport::new(|_| Reply::json(201, &json!({ "success": true })));
    let store = SessionStore::new();
    let gateway = gateway_with(store.clone(), transport.clone());
    let config = GatewayConfig::default();
    let user = NewUser {
        username: "carol".into(),
        email: "carol@example.test".into(),
        password: "pw".into(),
        role: None,
    };

    let body = AuthClient::new(&gateway, &config)
        .sign_up(&user)
        .await
        .unwrap();

    assert_eq!(body, json!({ "success": true }));
    assert!(!store.is_authenticated());
    let sent = &transport.requests()[0];
    assert_eq!(sent.path, "/auth/signup");
    assert_eq!(
        sent.body,
        Some(json!({ "user": { "username": "carol", "email": "carol@example.test", "password": "pw" } }))
    );
}

#[tokio::test]
async fn verify_otp_authenticates() {
    let transport = MockTransport::new(|_| Reply::json(200, &json!({ "accessToken": "T5", "refreshToken": "R5" })));
    let store = SessionStore::new();
    let gateway = gateway_with(store.clone(), transport.clone());
    let config = GatewayConfig::default();

    AuthClient::new(&gateway, &config)
        .verify_otp("carol", "123456")
        .await
        .unwrap();

    assert!(store.is_authenticated());
    assert_eq!(store.access_token().as_deref(), Some("T5"));
    assert_eq!(store.username().as_deref(), Some("carol"));
    assert_eq!(
        transport.requests()[0].body,
        Some(json!({ "user": { "username": "carol" }, "otp": "123456" }))
    );
}

// =============================================================================
// sign_out
// =============================================================================

#[tokio::test]
async fn sign_out_clears_locally() {
    let transport = MockTransport::new(|_| Reply::status(200));
    let store = signed_in_store();
    let gateway = gateway_with(store.clone(), transport.clone());
    let config = GatewayConfig::default();

    AuthClient::new(&gateway, &config).sign_out();

    assert_eq!(store.snapshot(), Session::default());
    assert!(transport.requests().is_empty());
}
