use super::*;

// =============================================================================
// state transitions
// =============================================================================

#[test]
fn new_store_is_empty() {
    let store = SessionStore::new();
    assert_eq!(store.snapshot(), Session::default());
    assert!(!store.is_authenticated());
    assert_eq!(store.access_token(), None);
    assert_eq!(store.refresh_token(), None);
}

#[test]
fn set_authenticated_overwrites_all_fields() {
    let store = SessionStore::new();
    store.set_authenticated("T1", "R1", "alice");
    store.set_authenticated("T9", "R9", "bob");
    assert_eq!(
        store.snapshot(),
        Session {
            access_token: Some("T9".into()),
            refresh_token: Some("R9".into()),
            username: Some("bob".into()),
            is_authenticated: true,
        }
    );
}

#[test]
fn rotate_tokens_keeps_username_and_flag() {
    let store = SessionStore::new();
    store.set_authenticated("T1", "R1", "alice");
    store.rotate_tokens("T2", "R2");
    assert_eq!(store.access_token().as_deref(), Some("T2"));
    assert_eq!(store.refresh_token().as_deref(), Some("R2"));
    assert_eq!(store.username().as_deref(), Some("alice"));
    assert!(store.is_authenticated());
}

#[test]
fn clear_drops_both_tokens() {
    let store = SessionStore::new();
    store.set_authenticated("T1", "R1", "alice");
    store.clear();
    assert_eq!(store.snapshot(), Session::default());
}

#[test]
fn clones_share_state() {
    let store = SessionStore::new();
    let other = store.clone();
    store.set_authenticated("T1", "R1", "alice");
    assert_eq!(other.access_token().as_deref(), Some("T1"));
    other.clear();
    assert!(!store.is_authenticated());
}

#[test]
fn debug_omits_tokens() {
    let store = SessionStore::new();
    store.set_authenticated("secret-access", "secret-refresh", "alice");
    let rendered = format!("{store:?}");
    assert!(rendered.contains("alice"));
    assert!(!rendered.contains("secret"));
}

// =============================================================================
// events
// =============================================================================

#[test]
fn mutations_publish_events_in_order() {
    let store = SessionStore::new();
    let mut rx = store.subscribe();

    store.set_authenticated("T1", "R1", "alice");
    store.rotate_tokens("T2", "R2");
    store.clear_with(SignOutReason::RefreshFailed);

    assert_eq!(rx.try_recv().unwrap(), SessionEvent::SignedIn { username: "alice".into() });
    assert_eq!(rx.try_recv().unwrap(), SessionEvent::TokensRotated);
    assert_eq!(
        rx.try_recv().unwrap(),
        SessionEvent::SignedOut { reason: SignOutReason::RefreshFailed }
    );
    assert!(rx.try_recv().is_err());
}

#[test]
fn clear_reports_logout() {
    let store = SessionStore::new();
    let mut rx = store.subscribe();
    store.clear();
    assert_eq!(rx.try_recv().unwrap(), SessionEvent::SignedOut { reason: SignOutReason::Logout });
}

#[test]
fn mutations_without_subscribers_do_not_panic() {
    let store = SessionStore::new();
    store.set_authenticated("T1", "R1", "alice");
    store.clear();
}
