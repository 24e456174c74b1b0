use crate::models::{Anamnesis, Session};
use crate::services::metadata_store::{decode_row, encode_row, MetadataStore, Query};
use service_core::error::AppError;
use std::sync::Arc;

pub const ANAMNESIS_TABLE: &str = "client_anamnesis";

#[derive(Clone)]
pub struct AnamnesisService {
    metadata: Arc<dyn MetadataStore>,
}

impl AnamnesisService {
    pub fn new(metadata: Arc<dyn MetadataStore>) -> Self {
        Self { metadata }
    }

    /// `None` until the first save for this client.
    pub async fn get(
        &self,
        session: &Session,
        client_id: &str,
    ) -> Result<Option<Anamnesis>, AppError> {
        let query = Query::new()
            .eq("client_id", client_id)
            .eq("user_id", session.user_id())
            .limit(1);
        let rows = self.metadata.select(ANAMNESIS_TABLE, &query).await?;
        rows.into_iter()
            .next()
            .map(|row| decode_row(ANAMNESIS_TABLE, row))
            .transpose()
    }

    /// Create or replace the client's anamnesis.
    pub async fn save(
        &self,
        session: &Session,
        client_id: &str,
        form: Anamnesis,
    ) -> Result<Anamnesis, AppError> {
        if client_id.trim().is_empty() {
            return Err(AppError::InvalidInput("client id is required".to_string()));
        }

        let record = form.for_save(client_id, session.user_id());
        let row = encode_row(ANAMNESIS_TABLE, &record)?;
        let stored = self
            .metadata
            .upsert(ANAMNESIS_TABLE, row, "client_id")
            .await?;

        tracing::info!(client_id = %client_id, "Anamnesis saved");
        decode_row(ANAMNESIS_TABLE, stored)
    }
}
