use crate::models::client::ClientInsert;
use crate::models::{Client, NewClient, Session};
use crate::services::metadata_store::{decode_row, decode_rows, encode_row, MetadataStore, Query};
use service_core::error::AppError;
use std::sync::Arc;
use validator::Validate;

pub const CLIENTS_TABLE: &str = "clients";

#[derive(Clone)]
pub struct ClientService {
    metadata: Arc<dyn MetadataStore>,
}

impl ClientService {
    pub fn new(metadata: Arc<dyn MetadataStore>) -> Self {
        Self { metadata }
    }

    /// The user's clients, ordered by name.
    pub async fn list(&self, session: &Session) -> Result<Vec<Client>, AppError> {
        let query = Query::new()
            .eq("user_id", session.user_id())
            .order("name", true);
        let rows = self.metadata.select(CLIENTS_TABLE, &query).await?;
        decode_rows(CLIENTS_TABLE, rows)
    }

    pub async fn get(&self, session: &Session, id: &str) -> Result<Client, AppError> {
        let query = Query::new()
            .eq("id", id)
            .eq("user_id", session.user_id())
            .limit(1);
        let row = self
            .metadata
            .select(CLIENTS_TABLE, &query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("client {} not found", id)))?;
        decode_row(CLIENTS_TABLE, row)
    }

    pub async fn create(&self, session: &Session, client: NewClient) -> Result<Client, AppError> {
        let client = client.normalized();
        client.validate()?;

        let row = encode_row(
            CLIENTS_TABLE,
            &ClientInsert {
                user_id: session.user_id(),
                name: &client.name,
                phone: client.phone.as_deref(),
                email: client.email.as_deref(),
            },
        )?;
        let stored = self.metadata.insert(CLIENTS_TABLE, row).await?;
        let created: Client = decode_row(CLIENTS_TABLE, stored)?;

        tracing::info!(client_id = %created.id, user_id = %created.user_id, "Client created");
        Ok(created)
    }
}
