use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DermaError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Image processing failed: {0}")]
    ImageProcessing(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("File too large: {0} bytes, max allowed: {1} bytes")]
    FileTooLarge(usize, usize),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Image decode error: {0}")]
    ImageDecode(#[from] image::ImageError),

    #[error("ORT error: {0}")]
    Ort(#[from] ort::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl DermaError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DermaError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            DermaError::FileTooLarge(_, _) => StatusCode::PAYLOAD_TOO_LARGE,
            DermaError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            DermaError::Base64(_) => StatusCode::BAD_REQUEST,
            DermaError::Json(_) => StatusCode::BAD_REQUEST,
            DermaError::ImageDecode(_) => StatusCode::BAD_REQUEST,
            DermaError::ModelLoad(_) => StatusCode::SERVICE_UNAVAILABLE,
            DermaError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            DermaError::ModelLoad(_) => "MODEL_LOAD_ERROR",
            DermaError::ImageProcessing(_) => "IMAGE_PROCESSING_ERROR",
            DermaError::Inference(_) => "INFERENCE_ERROR",
            DermaError::InvalidInput(_) => "INVALID_INPUT",
            DermaError::FileTooLarge(_, _) => "FILE_TOO_LARGE",
            DermaError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            DermaError::Config(_) => "CONFIG_ERROR",
            DermaError::Io(_) => "IO_ERROR",
            DermaError::Json(_) => "JSON_ERROR",
            DermaError::Base64(_) => "BASE64_DECODE_ERROR",
            DermaError::ImageDecode(_) => "IMAGE_DECODE_ERROR",
            DermaError::Ort(_) => "ORT_ERROR",
            DermaError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for DermaError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_response = serde_json::json!({
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
            }
        });

        tracing::error!("Request failed: {} ({})", self, status);

        (status, axum::Json(error_response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_4xx() {
        assert_eq!(
            DermaError::InvalidInput("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            DermaError::UnsupportedFormat("image/gif".into()).status_code(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            DermaError::FileTooLarge(100, 10).status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[test]
    fn missing_model_is_service_unavailable() {
        let err = DermaError::ModelLoad("yolo_lesion.onnx not found".into());
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.error_code(), "MODEL_LOAD_ERROR");
    }
}
