use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
};
use serde_json::json;
use axum::Json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// The workbook or sheet does not have the shape a report needs.
    #[error("Invalid report structure: {0}")]
    Structural(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("HTTP Error: {0}")]
    HttpError(String),
    #[error("File processing error: {0}")]
    FileProcessingError(String),
    #[error("Metric error: {0}")]
    Metric(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::HttpError(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Structural(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::HttpError(_) => StatusCode::BAD_GATEWAY,
            AppError::FileProcessingError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Metric(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        tracing::warn!("Request failed with {}: {}", status, self);

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}
