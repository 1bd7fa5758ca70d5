//! API 错误响应
//!
//! 所有错误统一为 `{"error": "..."}` JSON 体，状态码按错误类别映射。

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use vidcast_core::errors::{JobError, RegistryError};
use vidcast_services::PipelineError;

/// API 错误
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<JobError> for ApiError {
    fn from(err: JobError) -> Self {
        let status = match &err {
            JobError::NotFound(_) => StatusCode::NOT_FOUND,
            JobError::NotFinished(_, _) => StatusCode::CONFLICT,
            JobError::Failed(_) => StatusCode::UNPROCESSABLE_ENTITY,
        };
        Self::new(status, err.to_string())
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        let status = match &err {
            RegistryError::Validation(_) => StatusCode::BAD_REQUEST,
            RegistryError::NoProviderAvailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        Self::new(status, err.to_string())
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        let status = match &err {
            PipelineError::Registry(RegistryError::Validation(_)) => StatusCode::BAD_REQUEST,
            PipelineError::Registry(RegistryError::NoProviderAvailable(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            PipelineError::AllProvidersFailed(_) => StatusCode::BAD_GATEWAY,
            PipelineError::NoUsableClient(_) => StatusCode::SERVICE_UNAVAILABLE,
            PipelineError::Media(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}
