use crate::services::backend::{error_from_response, BackendClient};
use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use service_core::error::AppError;

/// Row filter for the metadata store: equality filters, one ordering, a limit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<(String, String)>,
    pub order: Option<(String, bool)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl Into<String>) -> Self {
        self.filters.push((column.to_string(), value.into()));
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        self.order = Some((column.to_string(), ascending));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn to_params(&self) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = self
            .filters
            .iter()
            .map(|(column, value)| (column.clone(), format!("eq.{}", value)))
            .collect();

        if let Some((column, ascending)) = &self.order {
            let direction = if *ascending { "asc" } else { "desc" };
            params.push(("order".to_string(), format!("{}.{}", column, direction)));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }
}

#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>, AppError>;

    /// Insert one row and return it as stored (with generated columns).
    async fn insert(&self, table: &str, row: Value) -> Result<Value, AppError>;

    /// Insert or update the row that conflicts on `on_conflict`.
    async fn upsert(&self, table: &str, row: Value, on_conflict: &str) -> Result<Value, AppError>;

    /// Delete matching rows and return how many were removed.
    async fn delete(&self, table: &str, query: &Query) -> Result<usize, AppError>;
}

/// Row storage of the hosted backend (REST gateway over Postgres).
pub struct HostedMetadataStore {
    backend: BackendClient,
}

impl HostedMetadataStore {
    pub fn new(backend: BackendClient) -> Self {
        Self { backend }
    }

    fn table_path(table: &str) -> String {
        format!("/rest/v1/{}", table)
    }

    async fn write(
        &self,
        table: &str,
        row: Value,
        on_conflict: Option<&str>,
    ) -> Result<Value, AppError> {
        let mut request = self
            .backend
            .request(Method::POST, &Self::table_path(table))
            .json(&row);

        request = match on_conflict {
            Some(column) => request
                .query(&[("on_conflict", column)])
                .header("Prefer", "resolution=merge-duplicates,return=representation"),
            None => request.header("Prefer", "return=representation"),
        };

        let response = request.send().await.map_err(|e| {
            AppError::MetadataWriteError(anyhow::anyhow!("write to {} failed: {}", table, e))
        })?;

        if !response.status().is_success() {
            return Err(AppError::MetadataWriteError(
                error_from_response(response).await,
            ));
        }

        let rows: Vec<Value> = response.json().await.map_err(|e| {
            AppError::MetadataWriteError(anyhow::anyhow!("invalid response from {}: {}", table, e))
        })?;

        rows.into_iter().next().ok_or_else(|| {
            AppError::MetadataWriteError(anyhow::anyhow!("{} returned no row", table))
        })
    }
}

#[async_trait]
impl MetadataStore for HostedMetadataStore {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>, AppError> {
        let mut params = vec![("select".to_string(), "*".to_string())];
        params.extend(query.to_params());

        let response = self
            .backend
            .request(Method::GET, &Self::table_path(table))
            .query(&params)
            .send()
            .await
            .map_err(|e| {
                AppError::MetadataReadError(anyhow::anyhow!("read of {} failed: {}", table, e))
            })?;

        if !response.status().is_success() {
            return Err(AppError::MetadataReadError(
                error_from_response(response).await,
            ));
        }

        response.json().await.map_err(|e| {
            AppError::MetadataReadError(anyhow::anyhow!("invalid rows from {}: {}", table, e))
        })
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value, AppError> {
        self.write(table, row, None).await
    }

    async fn upsert(&self, table: &str, row: Value, on_conflict: &str) -> Result<Value, AppError> {
        self.write(table, row, Some(on_conflict)).await
    }

    async fn delete(&self, table: &str, query: &Query) -> Result<usize, AppError> {
        if query.filters.is_empty() {
            return Err(AppError::InvalidInput(format!(
                "refusing unfiltered delete on {}",
                table
            )));
        }

        let response = self
            .backend
            .request(Method::DELETE, &Self::table_path(table))
            .query(&query.to_params())
            .header("Prefer", "return=representation")
            .send()
            .await
            .map_err(|e| {
                AppError::MetadataDeleteError(anyhow::anyhow!("delete on {} failed: {}", table, e))
            })?;

        if !response.status().is_success() {
            return Err(AppError::MetadataDeleteError(
                error_from_response(response).await,
            ));
        }

        let removed: Vec<Value> = response.json().await.unwrap_or_default();
        Ok(removed.len())
    }
}

/// Decode rows read from the metadata store into typed records.
pub fn decode_rows<T: DeserializeOwned>(table: &str, rows: Vec<Value>) -> Result<Vec<T>, AppError> {
    rows.into_iter()
        .map(|row| decode_row(table, row))
        .collect()
}

pub fn decode_row<T: DeserializeOwned>(table: &str, row: Value) -> Result<T, AppError> {
    serde_json::from_value(row).map_err(|e| {
        AppError::MetadataReadError(anyhow::anyhow!("unexpected row shape in {}: {}", table, e))
    })
}

/// Encode a typed record for writing.
pub fn encode_row<T: serde::Serialize>(table: &str, record: &T) -> Result<Value, AppError> {
    serde_json::to_value(record).map_err(|e| {
        AppError::InternalError(anyhow::anyhow!("failed to encode row for {}: {}", table, e))
    })
}
