//! Request handlers

use axum::{body::Bytes, extract::State, Json};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::info;

use crate::error::{AppError, Result};
use crate::provider::traits::{DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::provider::GenerationRequest;
use crate::AppState;

/// Message for a missing or unreadable prompt
pub const PROMPT_REQUIRED: &str = "A prompt is required";

/// Successful generation response
#[derive(Debug, Serialize)]
pub struct GenerateImageResponse {
    pub success: bool,
    pub prompt: String,
    pub image_url: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// `POST /generate-image`
pub async fn generate_image(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<GenerateImageResponse>> {
    let request = parse_request(&body)?;

    info!(
        width = request.width(),
        height = request.height(),
        "Image generation requested"
    );

    let artifact = state.orchestrator.generate(&request).await?;

    Ok(Json(GenerateImageResponse {
        success: true,
        prompt: request.prompt().to_string(),
        image_url: artifact.public_url,
    }))
}

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Read the inbound body into a clamped request.
///
/// Any body that does not yield a string prompt is a missing prompt.
fn parse_request(body: &[u8]) -> Result<GenerationRequest> {
    let fields = match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(fields)) => fields,
        _ => return Err(AppError::Validation(PROMPT_REQUIRED.to_string())),
    };

    let prompt = match fields.get("prompt") {
        Some(Value::String(prompt)) => prompt.clone(),
        _ => return Err(AppError::Validation(PROMPT_REQUIRED.to_string())),
    };

    let width = dimension(&fields, "width", DEFAULT_WIDTH)?;
    let height = dimension(&fields, "height", DEFAULT_HEIGHT)?;

    Ok(GenerationRequest::new(prompt, width, height))
}

/// Absent or null falls back to the default; values above `u32::MAX` saturate
/// and are clamped to the provider maximum anyway.
fn dimension(fields: &Map<String, Value>, name: &str, default: u32) -> Result<u32> {
    match fields.get(name) {
        None | Some(Value::Null) => Ok(default),
        Some(value) => value
            .as_u64()
            .map(|v| u32::try_from(v).unwrap_or(u32::MAX))
            .ok_or_else(|| AppError::Validation(format!("{} must be a non-negative integer", name))),
    }
}
