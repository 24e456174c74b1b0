//! Process-wide authentication state.
//!
//! The manager owns the single [`AuthState`] of the process and publishes it
//! over a watch channel. It is fed by two sources: one initial lookup
//! ([`SessionManager::initialize`]) and the identity provider's change stream
//! ([`SessionManager::subscribe`]). Both apply under one lock, so updates are
//! never interleaved, and `is_loading` only ever moves from `true` to `false`.

use crate::models::{AuthState, Session, SessionChange};
use crate::services::identity::IdentityProvider;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

pub struct SessionManager {
    provider: Arc<dyn IdentityProvider>,
    state: watch::Sender<AuthState>,
    apply_lock: tokio::sync::Mutex<()>,
    changes_applied: AtomicU64,
    last_error: Mutex<Option<String>>,
    listener: Mutex<Option<CancellationToken>>,
}

impl SessionManager {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        let (state, _) = watch::channel(AuthState::loading());
        Self {
            provider,
            state,
            apply_lock: tokio::sync::Mutex::new(()),
            changes_applied: AtomicU64::new(0),
            last_error: Mutex::new(None),
            listener: Mutex::new(None),
        }
    }

    /// Resolve the session that existed before the process started.
    ///
    /// Never fails: a provider error is logged, kept for diagnostics and
    /// resolves to "no session".
    pub async fn initialize(&self) {
        tracing::debug!("Resolving initial session");
        let result = self.provider.get_current_session().await;

        let _guard = self.apply_lock.lock().await;

        let session = match result {
            Ok(session) => session,
            Err(e) => {
                tracing::error!("Error getting initial session: {}", e);
                *self
                    .last_error
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner) = Some(e.to_string());
                None
            }
        };

        if self.changes_applied.load(Ordering::SeqCst) > 0 {
            // A change event already carried a fresher session.
            tracing::debug!("Initial session lookup superseded by a change event");
            return;
        }

        tracing::info!(
            authenticated = session.is_some(),
            user_id = session.as_ref().map(Session::user_id).unwrap_or("-"),
            "Initial session resolved"
        );
        self.state.send_replace(AuthState::resolved(session));
    }

    /// Start applying the provider's session changes in arrival order.
    /// A second call while subscribed does nothing.
    pub fn subscribe(self: &Arc<Self>) {
        let mut listener = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if listener.is_some() {
            tracing::debug!("Session listener already registered");
            return;
        }

        let token = CancellationToken::new();
        let cancelled = token.clone();
        let mut changes = self.provider.on_session_change();
        let manager: Weak<Self> = Arc::downgrade(self);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => break,
                    change = changes.recv() => match change {
                        Ok(change) => {
                            let Some(manager) = manager.upgrade() else { break };
                            manager.apply_change(change).await;
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "Session change stream lagged");
                        }
                        Err(RecvError::Closed) => {
                            tracing::info!("Session change stream closed");
                            break;
                        }
                    }
                }
            }
            tracing::debug!("Session listener stopped");
        });

        *listener = Some(token);
    }

    /// Stop listening to session changes. Safe to call any number of times.
    pub fn teardown(&self) {
        let token = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(token) = token {
            token.cancel();
            tracing::debug!("Session listener unregistered");
        }
    }

    async fn apply_change(&self, change: SessionChange) {
        let _guard = self.apply_lock.lock().await;
        self.changes_applied.fetch_add(1, Ordering::SeqCst);

        tracing::info!(
            event = ?change.event,
            user_id = change.session.as_ref().map(Session::user_id).unwrap_or("-"),
            "Session changed"
        );
        self.state.send_replace(AuthState::resolved(change.session));
    }

    pub fn current(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// Wait until the initial resolution has happened.
    pub async fn resolved(&self) -> AuthState {
        let mut rx = self.state.subscribe();
        let state = match rx.wait_for(|state| !state.is_loading).await {
            Ok(state) => state.clone(),
            // The sender lives in `self`, so it cannot be closed while borrowed.
            Err(_) => self.current(),
        };
        state
    }

    /// The error from the initial lookup, if it failed. Diagnostics only.
    pub fn last_error(&self) -> Option<String> {
        self.last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SessionEvent, SessionUser};
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use service_core::error::AppError;
    use std::time::Duration as StdDuration;
    use tokio::sync::{broadcast, Notify};

    struct ScriptedProvider {
        initial: Mutex<Option<Result<Option<Session>, AppError>>>,
        gate: Notify,
        gated: bool,
        changes: broadcast::Sender<SessionChange>,
    }

    impl ScriptedProvider {
        fn new(initial: Result<Option<Session>, AppError>) -> Self {
            let (changes, _) = broadcast::channel(16);
            Self {
                initial: Mutex::new(Some(initial)),
                gate: Notify::new(),
                gated: false,
                changes,
            }
        }

        fn gated(initial: Result<Option<Session>, AppError>) -> Self {
            Self {
                gated: true,
                ..Self::new(initial)
            }
        }

        fn emit(&self, event: SessionEvent, session: Option<Session>) {
            self.changes
                .send(SessionChange::new(event, session))
                .unwrap();
        }
    }

    #[async_trait]
    impl IdentityProvider for ScriptedProvider {
        async fn get_current_session(&self) -> Result<Option<Session>, AppError> {
            if self.gated {
                self.gate.notified().await;
            }
            self.initial.lock().unwrap().take().unwrap_or(Ok(None))
        }

        fn on_session_change(&self) -> broadcast::Receiver<SessionChange> {
            self.changes.subscribe()
        }

        async fn sign_in_with_password(&self, _: &str, _: &str) -> Result<Session, AppError> {
            Err(AppError::Unauthorized(anyhow::anyhow!("not scripted")))
        }

        async fn sign_out(&self) -> Result<(), AppError> {
            Ok(())
        }
    }

    fn session(user: &str) -> Session {
        let now = Utc::now();
        Session {
            access_token: format!("token-{}", user),
            refresh_token: "refresh".to_string(),
            expires_at: now + Duration::hours(1),
            issued_at: now,
            user: SessionUser {
                id: user.to_string(),
                email: None,
            },
        }
    }

    async fn next_state(rx: &mut watch::Receiver<AuthState>) -> AuthState {
        tokio::time::timeout(StdDuration::from_secs(1), rx.changed())
            .await
            .expect("state change")
            .unwrap();
        rx.borrow_and_update().clone()
    }

    #[tokio::test]
    async fn starts_loading() {
        let manager = SessionManager::new(Arc::new(ScriptedProvider::new(Ok(None))));
        assert_eq!(manager.current(), AuthState::loading());
    }

    #[tokio::test]
    async fn absent_session_still_stops_loading() {
        let manager = SessionManager::new(Arc::new(ScriptedProvider::new(Ok(None))));
        manager.initialize().await;
        assert_eq!(manager.current(), AuthState::resolved(None));
        assert!(manager.last_error().is_none());
    }

    #[tokio::test]
    async fn initialize_stores_existing_session() {
        let existing = session("u1");
        let manager = SessionManager::new(Arc::new(ScriptedProvider::new(Ok(Some(
            existing.clone(),
        )))));
        manager.initialize().await;
        assert_eq!(manager.current(), AuthState::resolved(Some(existing)));
    }

    #[tokio::test]
    async fn failed_lookup_fails_open_to_logged_out() {
        let manager = SessionManager::new(Arc::new(ScriptedProvider::new(Err(
            AppError::ProviderError(anyhow::anyhow!("network down")),
        ))));
        manager.initialize().await;

        assert_eq!(manager.current(), AuthState::resolved(None));
        assert!(manager.last_error().unwrap().contains("network down"));
    }

    #[tokio::test]
    async fn events_replace_session_in_order() {
        let provider = Arc::new(ScriptedProvider::new(Ok(None)));
        let manager = Arc::new(SessionManager::new(provider.clone()));
        let mut rx = manager.watch();
        manager.subscribe();
        manager.initialize().await;
        assert_eq!(next_state(&mut rx).await, AuthState::resolved(None));

        provider.emit(SessionEvent::SignedIn, Some(session("u1")));
        assert_eq!(
            next_state(&mut rx).await.session.map(|s| s.user.id),
            Some("u1".to_string())
        );

        provider.emit(SessionEvent::TokenRefreshed, Some(session("u2")));
        assert_eq!(
            next_state(&mut rx).await.session.map(|s| s.user.id),
            Some("u2".to_string())
        );

        provider.emit(SessionEvent::SignedOut, None);
        assert_eq!(next_state(&mut rx).await, AuthState::resolved(None));
    }

    #[tokio::test]
    async fn loading_flag_never_returns() {
        let provider = Arc::new(ScriptedProvider::new(Ok(None)));
        let manager = Arc::new(SessionManager::new(provider.clone()));
        let mut rx = manager.watch();
        manager.subscribe();

        let events = [
            (SessionEvent::InitialSession, None),
            (SessionEvent::SignedIn, Some(session("u1"))),
            (SessionEvent::UserUpdated, Some(session("u1"))),
            (SessionEvent::SignedOut, None),
            (SessionEvent::PasswordRecovery, Some(session("u3"))),
        ];
        let mut loading_transitions = 0;
        let mut was_loading = true;
        for (event, session) in events {
            provider.emit(event, session);
            let state = next_state(&mut rx).await;
            if was_loading && !state.is_loading {
                loading_transitions += 1;
            }
            assert!(!state.is_loading);
            was_loading = state.is_loading;
        }
        manager.initialize().await;
        assert!(!manager.current().is_loading);
        assert_eq!(loading_transitions, 1);
    }

    #[tokio::test]
    async fn late_initial_lookup_does_not_clobber_event() {
        let provider = Arc::new(ScriptedProvider::gated(Ok(Some(session("stale")))));
        let manager = Arc::new(SessionManager::new(provider.clone()));
        let mut rx = manager.watch();
        manager.subscribe();

        let init = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.initialize().await })
        };

        provider.emit(SessionEvent::SignedIn, Some(session("fresh")));
        next_state(&mut rx).await;

        provider.gate.notify_one();
        init.await.unwrap();

        assert_eq!(
            manager.current().session.map(|s| s.user.id),
            Some("fresh".to_string())
        );
    }

    #[tokio::test]
    async fn teardown_stops_updates_and_is_idempotent() {
        let provider = Arc::new(ScriptedProvider::new(Ok(None)));
        let manager = Arc::new(SessionManager::new(provider.clone()));
        manager.subscribe();
        manager.initialize().await;

        manager.teardown();
        manager.teardown();

        // The listener may need a moment to observe cancellation.
        tokio::time::sleep(StdDuration::from_millis(20)).await;
        let _ = provider.changes.send(SessionChange::new(
            SessionEvent::SignedIn,
            Some(session("u1")),
        ));
        tokio::time::sleep(StdDuration::from_millis(20)).await;

        assert_eq!(manager.current(), AuthState::resolved(None));
    }

    #[tokio::test]
    async fn resolved_waits_for_first_resolution() {
        let provider = Arc::new(ScriptedProvider::new(Ok(Some(session("u1")))));
        let manager = Arc::new(SessionManager::new(provider));

        let waiter = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.resolved().await })
        };
        manager.initialize().await;

        let state = waiter.await.unwrap();
        assert!(!state.is_loading);
        assert!(state.session.is_some());
    }
}
