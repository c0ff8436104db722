//! Common error types for the image relay

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Body sent for generation-stage failures
pub const GENERATION_FAILED: &str = "Image generation failed";
/// Body sent for upload-stage failures
pub const UPLOAD_FAILED: &str = "Image upload failed";
/// Body sent for anything not attributable to a stage
pub const UNEXPECTED: &str = "Unexpected server error";

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Token signing error: {0}")]
    TokenSigning(#[from] jsonwebtoken::errors::Error),

    #[error("{0}")]
    Validation(String),

    #[error("Upstream generation error: {0}")]
    UpstreamGeneration(String),

    #[error("Upstream upload error: {0}")]
    UpstreamUpload(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response format
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl AppError {
    /// Status code and client-facing message. Upstream detail never leaves the process.
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            AppError::Validation(message) => (StatusCode::BAD_REQUEST, message.clone()),
            AppError::UpstreamGeneration(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, GENERATION_FAILED.to_string())
            }
            AppError::UpstreamUpload(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, UPLOAD_FAILED.to_string())
            }
            AppError::Config(_)
            | AppError::Io(_)
            | AppError::Json(_)
            | AppError::HttpClient(_)
            | AppError::TokenSigning(_)
            | AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, UNEXPECTED.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
