use crate::middleware::auth::CurrentSession;
use crate::models::{PhotoFields, PhotoFile};
use crate::AppState;
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use service_core::error::AppError;

/// Largest accepted upload body.
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

pub async fn list_photos(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(client_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let photos = state.photos.list(&session, &client_id).await?;
    Ok(Json(photos))
}

/// Multipart form: `file` plus optional `label`, `description` and `photo_type`.
pub async fn upload_photo(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(client_id): Path<String>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut file: Option<PhotoFile> = None;
    let mut fields = PhotoFields::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        AppError::InvalidInput(format!("Failed to read multipart field: {}", e))
    })? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("unnamed").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(|e| {
                    tracing::error!("Failed to read file {}: {}", file_name, e);
                    AppError::InvalidInput(format!("Failed to read file bytes: {}", e))
                })?;
                file = Some(PhotoFile {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            "label" => {
                let value = read_text(field).await?;
                if !value.trim().is_empty() {
                    fields.label = Some(value.parse().map_err(AppError::InvalidInput)?);
                }
            }
            "description" => fields.description = Some(read_text(field).await?),
            "photo_type" => fields.photo_type = Some(read_text(field).await?),
            other => tracing::debug!(field = %other, "Ignoring unknown upload field"),
        }
    }

    // A missing file part is reported the same way as an empty one.
    let file = file.unwrap_or(PhotoFile {
        file_name: String::new(),
        content_type: "application/octet-stream".to_string(),
        bytes: Vec::new(),
    });

    let photo = state
        .photos
        .upload(&session, &client_id, file, fields)
        .await?;
    Ok((StatusCode::CREATED, Json(photo)))
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Failed to read form field: {}", e)))
}

#[derive(Debug, Deserialize)]
pub struct RemovePhotoParams {
    #[serde(default)]
    pub path: String,
}

pub async fn delete_photo(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path((_client_id, photo_id)): Path<(String, String)>,
    Query(params): Query<RemovePhotoParams>,
) -> Result<impl IntoResponse, AppError> {
    state
        .photos
        .remove(&session, &photo_id, &params.path)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
