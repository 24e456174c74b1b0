use crate::middleware::auth::CurrentSession;
use crate::models::NewClient;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

pub async fn list_clients(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<impl IntoResponse, AppError> {
    let clients = state.clients.list(&session).await?;
    Ok(Json(clients))
}

pub async fn get_client(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(client_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let client = state.clients.get(&session, &client_id).await?;
    Ok(Json(client))
}

pub async fn create_client(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Json(payload): Json<NewClient>,
) -> Result<impl IntoResponse, AppError> {
    let client = state.clients.create(&session, payload).await?;
    Ok((StatusCode::CREATED, Json(client)))
}
