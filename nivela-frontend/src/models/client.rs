use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Row of the `clients` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Client {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewClient {
    #[validate(custom(function = "not_blank", message = "O nome do cliente é obrigatório."))]
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    #[validate(email(message = "E-mail inválido."))]
    pub email: Option<String>,
}

impl NewClient {
    /// Trim the name and turn empty optional fields into absent ones.
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            phone: non_empty(self.phone),
            email: non_empty(self.email),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ClientInsert<'a> {
    pub user_id: &'a str,
    pub name: &'a str,
    pub phone: Option<&'a str>,
    pub email: Option<&'a str>,
}

pub(crate) fn not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        return Err(validator::ValidationError::new("required"));
    }
    Ok(())
}

pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
