use crate::models::photo::{PhotoInsert, DEFAULT_PHOTO_TYPE};
use crate::models::{ClientPhoto, GalleryPhoto, PhotoFields, PhotoFile, Session};
use crate::services::metadata_store::{decode_rows, encode_row, MetadataStore, Query};
use crate::services::object_store::ObjectStore;
use serde_json::Value;
use service_core::error::AppError;
use std::borrow::Cow;
use std::sync::Arc;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

pub const PHOTOS_TABLE: &str = "client_photos";

/// Steps of an upload, executed in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStep {
    PutObject,
    InsertRecord,
}

pub const UPLOAD_PLAN: [UploadStep; 2] = [UploadStep::PutObject, UploadStep::InsertRecord];

/// Undo action registered by a completed step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compensation {
    DeleteObject { path: String },
}

/// Photo uploads, removals and gallery listing for a client.
#[derive(Clone)]
pub struct PhotoService {
    objects: Arc<dyn ObjectStore>,
    metadata: Arc<dyn MetadataStore>,
}

impl PhotoService {
    pub fn new(objects: Arc<dyn ObjectStore>, metadata: Arc<dyn MetadataStore>) -> Self {
        Self { objects, metadata }
    }

    /// Store the file, then its metadata row. When the row cannot be written the
    /// stored object is deleted again, so no object is left without a row.
    pub async fn upload(
        &self,
        session: &Session,
        client_id: &str,
        file: PhotoFile,
        fields: PhotoFields,
    ) -> Result<ClientPhoto, AppError> {
        validate_upload(client_id, &file, &fields)?;

        let user_id = session.user_id();
        let path = format!(
            "{}/{}/{}.{}",
            user_id,
            client_id,
            Uuid::new_v4(),
            file.extension()
        );
        let photo_type = fields
            .photo_type
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_PHOTO_TYPE);
        let description = fields
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty());

        let row = encode_row(
            PHOTOS_TABLE,
            &PhotoInsert {
                client_id,
                user_id,
                photo_url: &path,
                label: fields.label,
                description,
                photo_type,
            },
        )?;

        tracing::info!(
            user_id = %user_id,
            client_id = %client_id,
            path = %path,
            size = file.bytes.len(),
            "Photo upload started"
        );

        let PhotoFile {
            content_type,
            bytes,
            ..
        } = file;
        let mut payload = Some(bytes);
        let mut stored: Option<Value> = None;
        let mut compensations: Vec<Compensation> = Vec::new();

        for step in UPLOAD_PLAN {
            let outcome = match step {
                UploadStep::PutObject => {
                    let data = payload.take().unwrap_or_default();
                    self.objects
                        .put(&path, data, &content_type)
                        .await
                        .map(|()| Some(Compensation::DeleteObject { path: path.clone() }))
                }
                UploadStep::InsertRecord => self
                    .metadata
                    .insert(PHOTOS_TABLE, row.clone())
                    .await
                    .map(|inserted| {
                        stored = Some(inserted);
                        None
                    }),
            };

            match outcome {
                Ok(Some(compensation)) => compensations.push(compensation),
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(step = ?step, path = %path, "Photo upload failed: {}", e);
                    self.unwind(compensations).await;
                    return Err(e);
                }
            }
        }

        // Both writes are committed from here on; nothing is rolled back.
        let stored = stored.ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!("upload plan finished without a row"))
        })?;
        let photo: ClientPhoto = serde_json::from_value(stored).map_err(|e| {
            tracing::error!(path = %path, "Photo stored but row could not be read back: {}", e);
            AppError::MetadataReadError(anyhow::anyhow!(
                "unexpected row shape in {}: {}",
                PHOTOS_TABLE,
                e
            ))
        })?;

        tracing::info!(photo_id = %photo.id, path = %path, "Photo upload completed");
        Ok(photo)
    }

    async fn unwind(&self, compensations: Vec<Compensation>) {
        for compensation in compensations.into_iter().rev() {
            match &compensation {
                Compensation::DeleteObject { path } => {
                    if let Err(e) = self.objects.delete(path).await {
                        tracing::warn!(path = %path, "Failed to roll back stored object: {}", e);
                    } else {
                        tracing::info!(path = %path, "Rolled back stored object");
                    }
                }
            }
        }
    }

    /// Delete the object, then the row. A storage failure does not stop the row delete.
    pub async fn remove(
        &self,
        session: &Session,
        photo_id: &str,
        storage_path: &str,
    ) -> Result<(), AppError> {
        let user_id = session.user_id();
        if photo_id.trim().is_empty() {
            return Err(AppError::InvalidInput("photo id is required".to_string()));
        }
        if !storage_path.is_empty() && !owns_path(user_id, storage_path) {
            return Err(AppError::InvalidInput(format!(
                "path {} is outside the user's folder",
                storage_path
            )));
        }

        if storage_path.is_empty() {
            tracing::warn!(photo_id = %photo_id, "Photo has no stored object");
        } else if let Err(e) = self.objects.delete(storage_path).await {
            tracing::error!(
                photo_id = %photo_id,
                path = %storage_path,
                "Failed to delete stored object, removing row anyway: {}",
                e
            );
        }

        let query = Query::new().eq("id", photo_id).eq("user_id", user_id);
        let removed = self.metadata.delete(PHOTOS_TABLE, &query).await?;
        tracing::info!(photo_id = %photo_id, removed = removed, "Photo removed");
        Ok(())
    }

    /// Photos of a client, newest first.
    pub async fn list(
        &self,
        session: &Session,
        client_id: &str,
    ) -> Result<Vec<GalleryPhoto>, AppError> {
        let query = Query::new()
            .eq("client_id", client_id)
            .eq("user_id", session.user_id())
            .order("created_at", false);
        let rows = self.metadata.select(PHOTOS_TABLE, &query).await?;
        let photos: Vec<ClientPhoto> = decode_rows(PHOTOS_TABLE, rows)?;

        Ok(photos
            .into_iter()
            .map(|photo| {
                if photo.photo_url.is_empty() {
                    GalleryPhoto {
                        photo,
                        public_url: None,
                        fetch_error: Some("Caminho da imagem ausente.".to_string()),
                    }
                } else {
                    let url = self.objects.public_url(&photo.photo_url);
                    GalleryPhoto {
                        photo,
                        public_url: Some(url),
                        fetch_error: None,
                    }
                }
            })
            .collect())
    }
}

fn owns_path(user_id: &str, path: &str) -> bool {
    path.strip_prefix(user_id)
        .and_then(|rest| rest.strip_prefix('/'))
        .is_some_and(|rest| !rest.is_empty() && !rest.split('/').any(|seg| seg == ".."))
}

/// Ids become object path segments: letters, digits, `-` and `_` only.
fn is_plain_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn field_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

fn validate_upload(
    client_id: &str,
    file: &PhotoFile,
    fields: &PhotoFields,
) -> Result<(), ValidationErrors> {
    let mut errors = match fields.validate() {
        Ok(()) => ValidationErrors::new(),
        Err(errors) => errors,
    };

    if file.bytes.is_empty() {
        errors.add("file", field_error("required", "Selecione uma foto."));
    }
    if !is_plain_id(client_id) {
        errors.add("client_id", field_error("invalid", "Cliente inválido."));
    }

    if errors.errors().is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
