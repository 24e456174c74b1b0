use crate::models::knowledge::FavoriteInsert;
use crate::models::{ContentCategory, ContentItem, Favorite, ItemFilter, KnowledgeItem, Session};
use crate::services::metadata_store::{decode_rows, encode_row, MetadataStore, Query};
use service_core::error::AppError;
use std::collections::HashSet;
use std::sync::Arc;

pub const CATEGORIES_TABLE: &str = "content_categories";
pub const ITEMS_TABLE: &str = "content_items";
pub const FAVORITES_TABLE: &str = "user_favorites";

/// Shared articles, videos and quick tips, with per-user favourites.
#[derive(Clone)]
pub struct KnowledgeService {
    metadata: Arc<dyn MetadataStore>,
}

impl KnowledgeService {
    pub fn new(metadata: Arc<dyn MetadataStore>) -> Self {
        Self { metadata }
    }

    pub async fn categories(&self) -> Result<Vec<ContentCategory>, AppError> {
        let query = Query::new().order("name", true);
        let rows = self.metadata.select(CATEGORIES_TABLE, &query).await?;
        decode_rows(CATEGORIES_TABLE, rows)
    }

    /// Items matching `filter`, newest first, flagged with the user's favourites.
    pub async fn items(
        &self,
        session: &Session,
        filter: &ItemFilter,
    ) -> Result<Vec<KnowledgeItem>, AppError> {
        let mut query = Query::new().order("created_at", false);
        if let Some(category) = filter.category.as_deref().filter(|c| !c.is_empty()) {
            query = query.eq("category_id", category);
        }
        if let Some(kind) = filter.kind {
            query = query.eq("type", kind.as_str());
        }

        let rows = self.metadata.select(ITEMS_TABLE, &query).await?;
        let items: Vec<ContentItem> = decode_rows(ITEMS_TABLE, rows)?;
        let favorites: HashSet<String> = self
            .favorites(session)
            .await?
            .into_iter()
            .map(|favorite| favorite.content_item_id)
            .collect();

        Ok(items
            .into_iter()
            .filter(|item| filter.matches_title(&item.title))
            .map(|item| {
                let is_favorite = favorites.contains(&item.id);
                KnowledgeItem { item, is_favorite }
            })
            .filter(|entry| !filter.favorites || entry.is_favorite)
            .collect())
    }

    /// Add or remove the item from the user's favourites. Returns whether it is
    /// a favourite afterwards.
    pub async fn toggle_favorite(&self, session: &Session, item_id: &str) -> Result<bool, AppError> {
        let item_id = item_id.trim();
        if item_id.is_empty() {
            return Err(AppError::InvalidInput("content item id is required".to_string()));
        }
        let user_id = session.user_id();
        let mine = Query::new()
            .eq("user_id", user_id)
            .eq("content_item_id", item_id);

        let removed = self.metadata.delete(FAVORITES_TABLE, &mine).await?;
        if removed > 0 {
            tracing::info!(user_id = %user_id, item_id = %item_id, "Favourite removed");
            return Ok(false);
        }

        let row = encode_row(
            FAVORITES_TABLE,
            &FavoriteInsert {
                user_id,
                content_item_id: item_id,
            },
        )?;
        self.metadata.insert(FAVORITES_TABLE, row).await?;
        tracing::info!(user_id = %user_id, item_id = %item_id, "Favourite added");
        Ok(true)
    }

    async fn favorites(&self, session: &Session) -> Result<Vec<Favorite>, AppError> {
        let query = Query::new().eq("user_id", session.user_id());
        let rows = self.metadata.select(FAVORITES_TABLE, &query).await?;
        decode_rows(FAVORITES_TABLE, rows)
    }
}
