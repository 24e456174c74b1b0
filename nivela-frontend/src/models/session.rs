use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Token bundle issued by the identity provider.
///
/// Never mutated: a refresh or sign-in produces a new value that replaces the
/// old one.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub issued_at: DateTime<Utc>,
    pub user: SessionUser,
}

impl Session {
    /// Subject identifier of the signed-in user.
    pub fn user_id(&self) -> &str {
        &self.user.id
    }

    pub fn expires_within(&self, margin: Duration, now: DateTime<Utc>) -> bool {
        self.expires_at - margin <= now
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionEvent {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
    PasswordRecovery,
}

/// One entry of the identity provider's change stream.
#[derive(Debug, Clone)]
pub struct SessionChange {
    pub event: SessionEvent,
    pub session: Option<Session>,
}

impl SessionChange {
    pub fn new(event: SessionEvent, session: Option<Session>) -> Self {
        Self { event, session }
    }
}

/// Resolved view that drives route gating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthState {
    pub session: Option<Session>,
    pub is_loading: bool,
}

impl AuthState {
    pub fn loading() -> Self {
        Self {
            session: None,
            is_loading: true,
        }
    }

    pub fn resolved(session: Option<Session>) -> Self {
        Self {
            session,
            is_loading: false,
        }
    }
}

impl Default for AuthState {
    fn default() -> Self {
        Self::loading()
    }
}

/// Public summary of the current state, safe to hand to the browser.
#[derive(Debug, Serialize)]
pub struct AuthSummary {
    pub is_loading: bool,
    pub authenticated: bool,
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<&AuthState> for AuthSummary {
    fn from(state: &AuthState) -> Self {
        let session = state.session.as_ref();
        Self {
            is_loading: state.is_loading,
            authenticated: session.is_some(),
            user_id: session.map(|s| s.user.id.clone()),
            email: session.and_then(|s| s.user.email.clone()),
            expires_at: session.map(|s| s.expires_at),
        }
    }
}
