use crate::models::{AuthState, AuthSummary};
use crate::services::navigation::LOGIN_PATH;
use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Form, Json,
};
use serde::Deserialize;
use service_core::error::AppError;
use std::time::Duration;
use validator::Validate;

pub const HOME_PATH: &str = "/clientes";

/// How long a login or logout waits for the shared auth state to catch up.
const STATE_SYNC_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "E-mail inválido."))]
    pub email: String,
    #[validate(length(min = 1, message = "Informe a senha."))]
    pub password: String,
}

pub async fn login_handler(
    State(state): State<AppState>,
    Form(payload): Form<LoginRequest>,
) -> Result<Response, AppError> {
    payload.validate()?;

    let session = match state
        .identity
        .sign_in_with_password(payload.email.trim(), &payload.password)
        .await
    {
        Ok(session) => session,
        Err(AppError::Unauthorized(e)) => {
            tracing::info!("Login rejected: {}", e);
            return Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                Html("<p class='text-red-500 text-sm'>E-mail ou senha inválidos.</p>"),
            )
                .into_response());
        }
        Err(e) => return Err(e),
    };

    let user_id = session.user_id().to_string();
    let synced = wait_for_state(&state, |auth| {
        auth.session.as_ref().map(|s| s.user_id()) == Some(user_id.as_str())
    })
    .await;
    if !synced {
        tracing::warn!(user_id = %user_id, "Auth state not updated after sign-in");
    }

    Ok((StatusCode::OK, [("HX-Redirect", HOME_PATH)], "").into_response())
}

pub async fn logout_handler(State(state): State<AppState>) -> Result<Response, AppError> {
    state.identity.sign_out().await?;

    if !wait_for_state(&state, |auth| auth.session.is_none()).await {
        tracing::warn!("Auth state not updated after sign-out");
    }

    Ok((StatusCode::OK, [("HX-Redirect", LOGIN_PATH)], "").into_response())
}

pub async fn session_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(AuthSummary::from(&state.sessions.current()))
}

/// Session changes reach the manager through its listener; wait until the
/// shared state reflects them so the next request sees the new session.
async fn wait_for_state<F>(state: &AppState, mut ready: F) -> bool
where
    F: FnMut(&AuthState) -> bool,
{
    let mut rx = state.sessions.watch();
    let changed = async move {
        let synced = rx.wait_for(|auth| ready(auth)).await.is_ok();
        synced
    };
    tokio::time::timeout(STATE_SYNC_TIMEOUT, changed)
        .await
        .unwrap_or(false)
}
