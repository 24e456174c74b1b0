use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Row of `content_categories`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentCategory {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Article,
    VideoLink,
    PdfLink,
    QuickTip,
    ExternalLink,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Article => "article",
            ContentKind::VideoLink => "video_link",
            ContentKind::PdfLink => "pdf_link",
            ContentKind::QuickTip => "quick_tip",
            ContentKind::ExternalLink => "external_link",
        }
    }
}

/// Row of `content_items`. Shared by every user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentItem {
    pub id: String,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: ContentKind,
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

/// Row of `user_favorites`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Favorite {
    pub id: String,
    pub content_item_id: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct FavoriteInsert<'a> {
    pub user_id: &'a str,
    pub content_item_id: &'a str,
}

/// A content item as listed for the signed-in user.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct KnowledgeItem {
    #[serde(flatten)]
    pub item: ContentItem,
    pub is_favorite: bool,
}

/// Listing filters, all optional. `q` matches titles case-insensitively.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ItemFilter {
    pub category: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<ContentKind>,
    pub q: Option<String>,
    pub favorites: bool,
}

impl ItemFilter {
    pub(crate) fn matches_title(&self, title: &str) -> bool {
        match self.q.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                title.to_lowercase().contains(&term.to_lowercase())
            }
            _ => true,
        }
    }
}
