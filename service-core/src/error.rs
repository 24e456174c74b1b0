use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Identity provider error: {0}")]
    ProviderError(anyhow::Error),

    #[error("Object storage write failed: {0}")]
    StorageWriteError(anyhow::Error),

    #[error("Object storage delete failed: {0}")]
    StorageDeleteError(anyhow::Error),

    #[error("Metadata read failed: {0}")]
    MetadataReadError(anyhow::Error),

    #[error("Metadata write failed: {0}")]
    MetadataWriteError(anyhow::Error),

    #[error("Metadata delete failed: {0}")]
    MetadataDeleteError(anyhow::Error),

    #[error("Unauthorized: {0}")]
    Unauthorized(anyhow::Error),

    #[error("Not found: {0}")]
    NotFound(anyhow::Error),

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),

    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

impl AppError {
    /// Message shown to the end user. Technical detail stays in logs and `details`.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) | AppError::InvalidInput(_) => {
                "Verifique os campos obrigatórios."
            }
            AppError::ProviderError(_) => "Não foi possível verificar a sessão.",
            AppError::StorageWriteError(_) => "Erro ao enviar arquivo.",
            AppError::StorageDeleteError(_) => "Erro ao excluir arquivo.",
            AppError::MetadataReadError(_) => "Erro ao carregar dados.",
            AppError::MetadataWriteError(_) => "Erro ao salvar dados.",
            AppError::MetadataDeleteError(_) => "Erro ao excluir dados.",
            AppError::Unauthorized(_) => "Você precisa estar logado.",
            AppError::NotFound(_) => {
                "Registro não encontrado ou você não tem permissão para acessá-lo."
            }
            AppError::ConfigError(_) | AppError::InternalError(_) => "Erro desconhecido.",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ProviderError(_)
            | AppError::StorageWriteError(_)
            | AppError::StorageDeleteError(_)
            | AppError::MetadataReadError(_)
            | AppError::MetadataWriteError(_)
            | AppError::MetadataDeleteError(_) => StatusCode::BAD_GATEWAY,
            AppError::ConfigError(_) | AppError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            details: Option<String>,
        }

        let status = self.status();
        let details = match &self {
            AppError::ValidationError(err) => Some(err.to_string()),
            AppError::InvalidInput(msg) => Some(msg.clone()),
            AppError::ConfigError(_) | AppError::InternalError(_) => None,
            other => Some(other.to_string()),
        };

        if status.is_server_error() {
            tracing::error!(status = %status, error = %self, "Request failed");
        }

        (
            status,
            Json(ErrorResponse {
                error: self.user_message().to_string(),
                details,
            }),
        )
            .into_response()
    }
}
