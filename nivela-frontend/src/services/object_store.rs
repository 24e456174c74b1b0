use crate::services::backend::{backend_message, error_from_response, BackendClient};
use async_trait::async_trait;
use reqwest::{Method, StatusCode, Url};
use service_core::error::AppError;

const OBJECT_SCOPE: &str = "/storage/v1/object";
const PUBLIC_SCOPE: &str = "/storage/v1/object/public";

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write a new object. Never overwrites an existing path.
    async fn put(&self, path: &str, data: Vec<u8>, content_type: &str) -> Result<(), AppError>;

    /// Delete an object. Succeeds when the object is already gone.
    async fn delete(&self, path: &str) -> Result<(), AppError>;

    fn public_url(&self, path: &str) -> String;
}

/// Object storage of the hosted backend, scoped to one bucket.
pub struct HostedObjectStore {
    backend: BackendClient,
    bucket: String,
}

impl HostedObjectStore {
    pub fn new(backend: BackendClient, bucket: impl Into<String>) -> Self {
        Self {
            backend,
            bucket: bucket.into(),
        }
    }

    /// Each part of the object path becomes its own encoded URL segment, so the
    /// stored key is exactly `path`.
    fn object_url(&self, scope: &str, path: &str) -> Url {
        let segments = std::iter::once(self.bucket.as_str())
            .chain(path.trim_start_matches('/').split('/'));
        self.backend.segment_url(scope, segments)
    }
}

#[async_trait]
impl ObjectStore for HostedObjectStore {
    async fn put(&self, path: &str, data: Vec<u8>, content_type: &str) -> Result<(), AppError> {
        let size = data.len();
        let response = self
            .backend
            .request_url(Method::POST, self.object_url(OBJECT_SCOPE, path))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(data)
            .send()
            .await
            .map_err(|e| {
                AppError::StorageWriteError(anyhow::anyhow!("upload of {} failed: {}", path, e))
            })?;

        if !response.status().is_success() {
            return Err(AppError::StorageWriteError(
                error_from_response(response).await,
            ));
        }

        tracing::debug!(path = %path, size = size, "Object stored");
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), AppError> {
        let response = self
            .backend
            .request_url(Method::DELETE, self.object_url(OBJECT_SCOPE, path))
            .send()
            .await
            .map_err(|e| {
                AppError::StorageDeleteError(anyhow::anyhow!("delete of {} failed: {}", path, e))
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        if is_not_found(status, &body) {
            tracing::debug!(path = %path, "Object already absent");
            return Ok(());
        }

        Err(AppError::StorageDeleteError(anyhow::anyhow!(
            "{} {}",
            status.as_u16(),
            backend_message(&body)
        )))
    }

    fn public_url(&self, path: &str) -> String {
        self.object_url(PUBLIC_SCOPE, path).into()
    }
}

/// Storage reports a missing object either as 404 or as 400 with a not-found body.
fn is_not_found(status: StatusCode, body: &str) -> bool {
    if status == StatusCode::NOT_FOUND {
        return true;
    }
    let message = body.to_lowercase();
    status == StatusCode::BAD_REQUEST
        && (message.contains("not_found") || message.contains("not found"))
}
