use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use validator::Validate;

pub const DEFAULT_PHOTO_TYPE: &str = "Geral";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhotoLabel {
    Antes,
    Depois,
    Durante,
    Outro,
}

impl FromStr for PhotoLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "antes" => Ok(PhotoLabel::Antes),
            "depois" => Ok(PhotoLabel::Depois),
            "durante" => Ok(PhotoLabel::Durante),
            "outro" => Ok(PhotoLabel::Outro),
            other => Err(format!("Invalid photo label: {}", other)),
        }
    }
}

/// Row of the `client_photos` table. `photo_url` holds the object path inside
/// the photo bucket, not a URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientPhoto {
    pub id: String,
    pub client_id: String,
    pub user_id: String,
    pub photo_url: String,
    #[serde(default)]
    pub label: Option<PhotoLabel>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_photo_type")]
    pub photo_type: String,
    pub created_at: DateTime<Utc>,
}

fn default_photo_type() -> String {
    DEFAULT_PHOTO_TYPE.to_string()
}

/// User-entered fields that accompany an upload.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct PhotoFields {
    #[serde(default)]
    pub label: Option<PhotoLabel>,
    #[serde(default)]
    #[validate(length(max = 2000, message = "Descrição muito longa."))]
    pub description: Option<String>,
    #[serde(default)]
    pub photo_type: Option<String>,
}

/// Binary payload of an upload.
#[derive(Debug, Clone)]
pub struct PhotoFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl PhotoFile {
    /// Extension taken from the original file name, `bin` when there is none.
    pub fn extension(&self) -> String {
        std::path::Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_else(|| "bin".to_string())
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct PhotoInsert<'a> {
    pub client_id: &'a str,
    pub user_id: &'a str,
    pub photo_url: &'a str,
    pub label: Option<PhotoLabel>,
    pub description: Option<&'a str>,
    pub photo_type: &'a str,
}

/// A stored photo as shown in the gallery.
#[derive(Debug, Clone, Serialize)]
pub struct GalleryPhoto {
    #[serde(flatten)]
    pub photo: ClientPhoto,
    pub public_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_error: Option<String>,
}
