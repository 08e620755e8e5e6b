use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use db::{StorageError, models::ownership::Resource};
use services::services::{
    csv_import::CsvImportError, discord::DiscordError, meta::MetaError, twitter::TwitterError,
    youtube::YoutubeError,
};
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authentication required")]
    Unauthorized,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Upstream(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn forbidden(resource: Resource) -> Self {
        ApiError::Forbidden(format!("You do not have access to this {}", resource.kind()))
    }
}

impl From<TwitterError> for ApiError {
    fn from(err: TwitterError) -> Self {
        ApiError::Upstream(err.to_string())
    }
}

impl From<YoutubeError> for ApiError {
    fn from(err: YoutubeError) -> Self {
        ApiError::Upstream(err.to_string())
    }
}

impl From<MetaError> for ApiError {
    fn from(err: MetaError) -> Self {
        ApiError::Upstream(err.to_string())
    }
}

impl From<DiscordError> for ApiError {
    fn from(err: DiscordError) -> Self {
        match err {
            DiscordError::Storage(e) => ApiError::Storage(e),
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

impl From<CsvImportError> for ApiError {
    fn from(err: CsvImportError) -> Self {
        match err {
            CsvImportError::Storage(e) => ApiError::Storage(e),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Upstream(msg) => {
                tracing::warn!(error = %msg, "upstream API call failed");
                (StatusCode::BAD_GATEWAY, msg.clone())
            }
            ApiError::Storage(err) => {
                tracing::error!(error = ?err, "storage error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
        };

        (status, Json(ApiResponse::<()>::error(&message))).into_response()
    }
}
