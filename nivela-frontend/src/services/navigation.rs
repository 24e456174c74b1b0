//! Route gating on top of [`AuthState`].
//!
//! [`decide`] gates every protected HTTP route through `require_session`.
//! [`RouteGuard`] follows the session state for the process as a whole and
//! reports each transition to a [`Navigator`].

use crate::models::AuthState;
use tokio::sync::watch;

pub const LOGIN_PATH: &str = "/login";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Initial resolution still running: neutral indicator, no redirect.
    Loading,
    /// Resolved without a session.
    RedirectToLogin,
    /// Resolved with a session: render the protected content.
    Render,
}

pub fn decide(state: &AuthState) -> GuardDecision {
    match (state.is_loading, &state.session) {
        (true, _) => GuardDecision::Loading,
        (false, None) => GuardDecision::RedirectToLogin,
        (false, Some(_)) => GuardDecision::Render,
    }
}

/// Performs navigation on behalf of the guard.
pub trait Navigator: Send {
    /// Navigate without adding a history entry.
    fn replace(&mut self, path: &str);
}

/// Applies [`decide`] to a navigator, redirecting once per transition into the
/// signed-out state.
pub struct RouteGuard<N: Navigator> {
    navigator: N,
    login_path: String,
    redirected: bool,
}

impl<N: Navigator> RouteGuard<N> {
    pub fn new(navigator: N) -> Self {
        Self::with_login_path(navigator, LOGIN_PATH)
    }

    pub fn with_login_path(navigator: N, login_path: impl Into<String>) -> Self {
        Self {
            navigator,
            login_path: login_path.into(),
            redirected: false,
        }
    }

    pub fn evaluate(&mut self, state: &AuthState) -> GuardDecision {
        let decision = decide(state);
        match decision {
            GuardDecision::RedirectToLogin => {
                if !self.redirected {
                    tracing::info!(to = %self.login_path, "No session found, redirecting to login");
                    self.navigator.replace(&self.login_path);
                    self.redirected = true;
                }
            }
            GuardDecision::Loading | GuardDecision::Render => self.redirected = false,
        }
        decision
    }

    /// Re-evaluate on every state change until the session manager goes away.
    pub async fn follow<F>(mut self, mut states: watch::Receiver<AuthState>, mut on_decision: F) -> N
    where
        F: FnMut(GuardDecision),
    {
        loop {
            let state = states.borrow_and_update().clone();
            on_decision(self.evaluate(&state));
            if states.changed().await.is_err() {
                break;
            }
        }
        self.navigator
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }
}
