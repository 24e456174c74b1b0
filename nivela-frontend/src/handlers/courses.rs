use crate::middleware::auth::CurrentSession;
use crate::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use service_core::error::AppError;

pub async fn list_courses(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<impl IntoResponse, AppError> {
    let courses = state.courses.list(&session).await?;
    Ok(Json(courses))
}
