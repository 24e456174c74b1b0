use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{Html, IntoResponse, Redirect, Response},
};
use service_core::error::AppError;

use crate::models::Session;
use crate::services::navigation::{decide, GuardDecision, LOGIN_PATH};
use crate::AppState;

const HX_REQUEST: &str = "HX-Request";
const HX_REDIRECT: &str = "HX-Redirect";

/// Gate protected routes on the shared auth state.
pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let auth = state.sessions.current();

    match decide(&auth) {
        GuardDecision::Loading => (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::RETRY_AFTER, "1")],
            Html("<p class='text-gray-500 text-sm'>Carregando...</p>"),
        )
            .into_response(),
        GuardDecision::RedirectToLogin => redirect_to_login(req.headers()),
        GuardDecision::Render => {
            if let Some(session) = auth.session {
                tracing::Span::current().record("user_id", session.user_id());
                req.extensions_mut().insert(session);
            }
            next.run(req).await
        }
    }
}

fn redirect_to_login(headers: &HeaderMap) -> Response {
    if headers.contains_key(HX_REQUEST) {
        (StatusCode::OK, [(HX_REDIRECT, LOGIN_PATH)]).into_response()
    } else {
        Redirect::to(LOGIN_PATH).into_response()
    }
}

/// Session placed on the request by [`require_session`].
pub struct CurrentSession(pub Session);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .map(CurrentSession)
            .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("no session on request")))
    }
}
