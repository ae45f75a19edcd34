use crate::models::Variant;
use crate::pipeline::Diagnosis;
use crate::utils::error::DermaError;
use crate::web::{extractors::ValidatedJson, AppState};
use crate::Result;
use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Instant;

/// JSON request body (base64 mode)
#[derive(Debug, Deserialize)]
pub struct PredictJsonRequest {
    /// Base64-encoded image data, optionally a data URL
    pub image: String,

    /// Model backend; defaults to the detector
    #[serde(default)]
    pub variant: Option<Variant>,
}

/// Response envelope shared by every endpoint
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
    pub timestamp: String,
    pub request_id: String,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
            request_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

/// JSON base64 upload handler
pub async fn predict_json_handler(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<PredictJsonRequest>,
) -> Result<Json<ApiResponse<Diagnosis>>> {
    let start_time = Instant::now();
    let variant = request.variant.unwrap_or(Variant::Detector);

    tracing::info!("Processing JSON predict request: variant={}", variant);

    let base64_clean = if request.image.starts_with("data:") {
        request.image.split(',').nth(1).unwrap_or(&request.image)
    } else {
        &request.image
    };
    let image_bytes = base64::engine::general_purpose::STANDARD
        .decode(base64_clean)
        .map_err(DermaError::Base64)?;

    let diagnosis = state.pipeline.run(&image_bytes, variant)?;

    tracing::info!(
        "JSON predict completed: variant={}, label={}, time={:.3}s",
        variant,
        diagnosis.label,
        start_time.elapsed().as_secs_f32()
    );

    Ok(Json(ApiResponse::success(diagnosis)))
}

/// Multipart file upload handler
pub async fn predict_upload_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<Diagnosis>>> {
    let start_time = Instant::now();

    let mut image_data: Option<axum::body::Bytes> = None;
    let mut variant = Variant::Detector;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| DermaError::InvalidInput(format!("Failed to read multipart field: {}", e)))?
    {
        let field_name = field.name().unwrap_or("unknown").to_string();

        match field_name.as_str() {
            "file" => {
                if let Some(content_type) = field.content_type() {
                    if !content_type.starts_with("image/") {
                        return Err(DermaError::UnsupportedFormat(content_type.to_string()));
                    }
                }

                let data = field.bytes().await.map_err(|e| {
                    DermaError::InvalidInput(format!("Failed to read file data: {}", e))
                })?;

                if data.is_empty() {
                    return Err(DermaError::InvalidInput("Empty file".to_string()));
                }

                tracing::debug!("Received file: {} bytes", data.len());
                image_data = Some(data);
            }
            "variant" => {
                let value = field.text().await.unwrap_or_default();
                if !value.is_empty() {
                    variant = Variant::from_str(&value)?;
                }
            }
            _ => {
                tracing::debug!("Ignoring unknown field: {}", field_name);
            }
        }
    }

    let image_data = image_data
        .ok_or_else(|| DermaError::InvalidInput("No image file provided".to_string()))?;

    let diagnosis = state.pipeline.run(&image_data, variant)?;

    tracing::info!(
        "Upload predict completed: variant={}, label={}, time={:.3}s",
        variant,
        diagnosis.label,
        start_time.elapsed().as_secs_f32()
    );

    Ok(Json(ApiResponse::success(diagnosis)))
}

/// Serve the last annotated detection artifact, re-read from its fixed path
pub async fn annotated_image_handler(State(state): State<AppState>) -> Response {
    let path = state.pipeline.annotated_path();
    match tokio::fs::read(path).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, "image/jpeg")], bytes).into_response(),
        Err(_) => (
            StatusCode::NOT_FOUND,
            "No annotated image available yet".to_string(),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_request_accepts_snake_case_variants() {
        let req: PredictJsonRequest =
            serde_json::from_str(r#"{"image":"aGVsbG8=","variant":"forest"}"#).unwrap();
        assert_eq!(req.variant, Some(Variant::Forest));
    }

    #[test]
    fn variant_defaults_to_detector_when_absent() {
        let req: PredictJsonRequest = serde_json::from_str(r#"{"image":"aGVsbG8="}"#).unwrap();
        assert!(req.variant.is_none());
        assert_eq!(req.variant.unwrap_or(Variant::Detector), Variant::Detector);
    }

    #[test]
    fn success_envelope_carries_data_and_request_id() {
        let resp = ApiResponse::success(42);
        assert!(resp.success);
        assert_eq!(resp.data, Some(42));
        assert!(resp.error.is_none());
        assert!(!resp.request_id.is_empty());
    }
}
