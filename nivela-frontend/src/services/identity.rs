use crate::models::{Session, SessionChange, SessionEvent, SessionUser};
use crate::services::backend::{error_from_response, BackendClient};
use crate::utils::jwt::decode_claims;
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use service_core::error::AppError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Sessions this close to expiry are refreshed before being handed out.
const REFRESH_MARGIN_SECS: i64 = 60;
const CHANGE_BUFFER: usize = 16;
/// Pause before retrying a background refresh that could not reach the provider.
const REFRESH_RETRY: std::time::Duration = std::time::Duration::from_secs(15);

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Existing session, refreshed first when it is about to expire.
    async fn get_current_session(&self) -> Result<Option<Session>, AppError>;

    /// Stream of session changes, delivered in the order they happen.
    fn on_session_change(&self) -> broadcast::Receiver<SessionChange>;

    async fn sign_in_with_password(&self, email: &str, password: &str)
        -> Result<Session, AppError>;

    async fn sign_out(&self) -> Result<(), AppError>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    #[serde(default)]
    expires_at: Option<i64>,
    user: SessionUser,
}

impl TokenResponse {
    fn into_session(self) -> Session {
        let now = Utc::now();
        let claims = decode_claims(&self.access_token).ok();

        let issued_at = claims
            .as_ref()
            .and_then(|c| c.issued_at())
            .unwrap_or(now);
        let expires_at = self
            .expires_at
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
            .or_else(|| claims.as_ref().and_then(|c| c.expires_at()))
            .unwrap_or(now + Duration::seconds(self.expires_in));

        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            issued_at,
            user: self.user,
        }
    }
}

/// Identity provider backed by the hosted backend's `/auth/v1` API.
pub struct HostedIdentity {
    backend: BackendClient,
    current: RwLock<Option<Session>>,
    changes: broadcast::Sender<SessionChange>,
    session_file: Option<PathBuf>,
}

impl HostedIdentity {
    /// Restores a session persisted by a previous run when `session_file` is set.
    pub async fn new(backend: BackendClient, session_file: Option<PathBuf>) -> Self {
        let restored = match &session_file {
            Some(path) => load_session(path).await,
            None => None,
        };
        let (changes, _) = broadcast::channel(CHANGE_BUFFER);

        Self {
            backend,
            current: RwLock::new(restored),
            changes,
            session_file,
        }
    }

    async fn request_token(
        &self,
        grant_type: &str,
        body: serde_json::Value,
    ) -> Result<Result<Session, StatusCode>, AppError> {
        let path = format!("/auth/v1/token?grant_type={}", grant_type);
        let response = self
            .backend
            .request(Method::POST, &path)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to reach identity provider: {}", e);
                AppError::ProviderError(anyhow::anyhow!("identity provider unreachable: {}", e))
            })?;

        let status = response.status();
        if status.is_client_error() {
            let err = error_from_response(response).await;
            tracing::warn!(grant_type = %grant_type, "Token request rejected: {}", err);
            return Ok(Err(status));
        }
        if !status.is_success() {
            return Err(AppError::ProviderError(error_from_response(response).await));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            AppError::ProviderError(anyhow::anyhow!("invalid token response: {}", e))
        })?;
        Ok(Ok(token.into_session()))
    }

    /// Exchange the refresh token for a new session. A rejected token signs out.
    async fn refresh(&self, session: &Session) -> Result<Option<Session>, AppError> {
        let body = serde_json::json!({ "refresh_token": session.refresh_token });
        match self.request_token("refresh_token", body).await? {
            Ok(refreshed) => {
                tracing::info!(user_id = %refreshed.user_id(), "Session refreshed");
                self.replace(SessionEvent::TokenRefreshed, Some(refreshed.clone()))
                    .await;
                Ok(Some(refreshed))
            }
            Err(status) => {
                tracing::info!(status = %status, "Stored session is no longer valid");
                self.replace(SessionEvent::SignedOut, None).await;
                Ok(None)
            }
        }
    }

    /// Refresh the session shortly before it expires, for as long as the
    /// process runs. Stops when `shutdown` is cancelled.
    pub fn spawn_refresh(self: &Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        let identity = Arc::clone(self);
        let mut changes = self.changes.subscribe();

        tokio::spawn(async move {
            loop {
                let current = identity.current.read().await.clone();
                let wait = current
                    .as_ref()
                    .map(|session| refresh_delay(session, Utc::now()));

                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    change = changes.recv() => {
                        if let Err(broadcast::error::RecvError::Closed) = change {
                            break;
                        }
                    }
                    _ = sleep_for(wait) => {
                        let Some(session) = current else { continue };
                        if let Err(e) = identity.refresh(&session).await {
                            tracing::warn!("Background session refresh failed: {}", e);
                            tokio::select! {
                                _ = shutdown.cancelled() => break,
                                _ = tokio::time::sleep(REFRESH_RETRY) => {}
                            }
                        }
                    }
                }
            }
            tracing::debug!("Session refresh task stopped");
        })
    }

    async fn replace(&self, event: SessionEvent, session: Option<Session>) {
        *self.current.write().await = session.clone();

        if let Some(path) = &self.session_file {
            persist_session(path, session.as_ref()).await;
        }

        // No receivers simply means nobody is listening yet.
        let _ = self.changes.send(SessionChange::new(event, session));
    }
}

#[async_trait]
impl IdentityProvider for HostedIdentity {
    async fn get_current_session(&self) -> Result<Option<Session>, AppError> {
        let Some(session) = self.current.read().await.clone() else {
            return Ok(None);
        };

        if !session.expires_within(Duration::seconds(REFRESH_MARGIN_SECS), Utc::now()) {
            return Ok(Some(session));
        }

        tracing::debug!(user_id = %session.user_id(), "Refreshing session before use");
        self.refresh(&session).await
    }

    fn on_session_change(&self) -> broadcast::Receiver<SessionChange> {
        self.changes.subscribe()
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AppError> {
        let body = serde_json::json!({ "email": email, "password": password });
        match self.request_token("password", body).await? {
            Ok(session) => {
                tracing::info!(user_id = %session.user_id(), "User signed in");
                self.replace(SessionEvent::SignedIn, Some(session.clone()))
                    .await;
                Ok(session)
            }
            Err(_) => Err(AppError::Unauthorized(anyhow::anyhow!(
                "invalid login credentials"
            ))),
        }
    }

    async fn sign_out(&self) -> Result<(), AppError> {
        let current = self.current.read().await.clone();

        if let Some(session) = current {
            // Revocation failure does not keep the user signed in locally.
            match self
                .backend
                .request_with_token(Method::POST, "/auth/v1/logout", &session.access_token)
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => {
                    tracing::info!(user_id = %session.user_id(), "Session revoked");
                }
                Ok(response) => {
                    let err = error_from_response(response).await;
                    tracing::error!("Failed to revoke session during sign-out: {}", err);
                }
                Err(e) => tracing::error!("Failed to revoke session during sign-out: {}", e),
            }
        }

        self.replace(SessionEvent::SignedOut, None).await;
        Ok(())
    }
}

/// Time left until the session enters the refresh margin.
fn refresh_delay(session: &Session, now: DateTime<Utc>) -> std::time::Duration {
    (session.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) - now)
        .to_std()
        .unwrap_or(std::time::Duration::ZERO)
}

/// Sleeps for `wait`, or forever when there is nothing to wait for.
async fn sleep_for(wait: Option<std::time::Duration>) {
    match wait {
        Some(wait) => tokio::time::sleep(wait).await,
        None => std::future::pending().await,
    }
}

async fn load_session(path: &Path) -> Option<Session> {
    let raw = match tokio::fs::read(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!(path = %path.display(), "Failed to read stored session: {}", e);
            return None;
        }
    };

    match serde_json::from_slice(&raw) {
        Ok(session) => Some(session),
        Err(e) => {
            tracing::warn!(path = %path.display(), "Ignoring unreadable stored session: {}", e);
            None
        }
    }
}

async fn persist_session(path: &Path, session: Option<&Session>) {
    let result = match session {
        Some(session) => match serde_json::to_vec(session) {
            Ok(raw) => tokio::fs::write(path, raw).await,
            Err(e) => {
                tracing::warn!("Failed to serialize session: {}", e);
                return;
            }
        },
        None => match tokio::fs::remove_file(path).await {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            other => other,
        },
    };

    if let Err(e) = result {
        tracing::warn!(path = %path.display(), "Failed to update stored session: {}", e);
    }
}
