use crate::middleware::auth::CurrentSession;
use crate::models::ItemFilter;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use service_core::error::AppError;

pub async fn list_categories(
    State(state): State<AppState>,
    CurrentSession(_session): CurrentSession,
) -> Result<impl IntoResponse, AppError> {
    let categories = state.knowledge.categories().await?;
    Ok(Json(categories))
}

/// Query string: `category`, `type`, `q` and `favorites=true`.
pub async fn list_items(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Query(filter): Query<ItemFilter>,
) -> Result<impl IntoResponse, AppError> {
    let items = state.knowledge.items(&session, &filter).await?;
    Ok(Json(items))
}

pub async fn toggle_favorite(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(item_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let favorite = state.knowledge.toggle_favorite(&session, &item_id).await?;
    Ok(Json(json!({ "item_id": item_id, "is_favorite": favorite })))
}
