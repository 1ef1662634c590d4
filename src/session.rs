//! Client-side session state.
//!
//! DESIGN
//! ======
//! `SessionStore` is a cheap-to-clone handle over one shared `Session`. It is
//! handed to the gateway at construction instead of being looked up globally.
//! Every mutation happens under a single write lock, so readers observe either
//! the old token pair or the new one, never a mix.
//!
//! Mutations are published as `SessionEvent`s on a broadcast channel so the
//! application shell can react (route guards, sign-in redirects).

use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::broadcast;

const EVENT_CHANNEL_CAPACITY: usize = 32;

// =============================================================================
// SESSION
// =============================================================================

/// Point-in-time view of the credential state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub username: Option<String>,
    pub is_authenticated: bool,
}

// =============================================================================
// EVENTS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignOutReason {
    /// Explicit logout by the user.
    Logout,
    /// The refresh token was rejected or the refresh call failed.
    RefreshFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn { username: String },
    TokensRotated,
    SignedOut { reason: SignOutReason },
}

// =============================================================================
// STORE
// =============================================================================

#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<Session>>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionStore {
    /// Create an empty, unauthenticated store.
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { inner: Arc::new(RwLock::new(Session::default())), events }
    }

    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.read(|s| s.access_token.clone())
    }

    #[must_use]
    pub fn refresh_token(&self) -> Option<String> {
        self.read(|s| s.refresh_token.clone())
    }

    #[must_use]
    pub fn username(&self) -> Option<String> {
        self.read(|s| s.username.clone())
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.read(|s| s.is_authenticated)
    }

    /// Copy of the whole session, taken under one read lock.
    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.read(Clone::clone)
    }

    /// Subscribe to session mutations. Events sent before subscribing are not replayed.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Record a successful sign-in or OTP verification. Overwrites every field.
    pub fn set_authenticated(
        &self,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        username: impl Into<String>,
    ) {
        let username = username.into();
        self.write(|s| {
            *s = Session {
                access_token: Some(access_token.into()),
                refresh_token: Some(refresh_token.into()),
                username: Some(username.clone()),
                is_authenticated: true,
            };
        });
        self.emit(SessionEvent::SignedIn { username });
    }

    /// Replace the token pair after a successful refresh.
    ///
    /// `username` and `is_authenticated` are left as they are.
    pub fn rotate_tokens(&self, access_token: impl Into<String>, refresh_token: impl Into<String>) {
        self.write(|s| {
            s.access_token = Some(access_token.into());
            s.refresh_token = Some(refresh_token.into());
        });
        self.emit(SessionEvent::TokensRotated);
    }

    /// Reset to the empty, unauthenticated state after a logout.
    pub fn clear(&self) {
        self.clear_with(SignOutReason::Logout);
    }

    /// Reset to the empty, unauthenticated state, recording why.
    pub fn clear_with(&self, reason: SignOutReason) {
        self.write(|s| *s = Session::default());
        self.emit(SessionEvent::SignedOut { reason });
    }

    fn read<T>(&self, f: impl FnOnce(&Session) -> T) -> T {
        let guard = self
            .inner
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    fn write(&self, f: impl FnOnce(&mut Session)) {
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut guard);
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let session = self.snapshot();
        f.debug_struct("SessionStore")
            .field("username", &session.username)
            .field("is_authenticated", &session.is_authenticated)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
