use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::backend::BackendError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Missing or invalid session")]
    Unauthenticated,
    #[error("Invalid sesskey")]
    InvalidSesskey,
    #[error("Missing capability: {0}")]
    MissingCapability(&'static str),
    #[error("Sorry, but you do not currently have permissions to do that")]
    NoPermission,
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("Database error: {0}")]
    Storage(#[from] sqlx::Error),
    #[error("File error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::InvalidSesskey | AppError::MissingCapability(_) | AppError::NoPermission => {
                StatusCode::FORBIDDEN
            }
            AppError::Validation(_) | AppError::Backend(_) => StatusCode::BAD_REQUEST,
            AppError::Storage(_) | AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            AppError::Storage(_) | AppError::Io(_) => tracing::error!("Request failed: {}", self),
            _ => tracing::warn!("Request rejected: {}", self),
        }
        let body = Json(json!({
            "success": false,
            "error": self.to_string(),
        }));
        (status, body).into_response()
    }
}
