use crate::middleware::auth::CurrentSession;
use crate::models::Anamnesis;
use crate::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

/// `null` when the client has no anamnesis yet.
pub async fn get_anamnesis(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(client_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let anamnesis = state.anamnesis.get(&session, &client_id).await?;
    Ok(Json(anamnesis))
}

pub async fn save_anamnesis(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(client_id): Path<String>,
    Json(form): Json<Anamnesis>,
) -> Result<impl IntoResponse, AppError> {
    let saved = state.anamnesis.save(&session, &client_id, form).await?;
    Ok(Json(saved))
}
