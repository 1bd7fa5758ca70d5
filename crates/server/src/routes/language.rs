//! 语言检测路由

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use vidcast_core::models::LanguageDetection;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DetectRequest {
    pub text: String,
}

/// POST /api/language/detect
pub async fn detect(
    State(state): State<AppState>,
    Json(request): Json<DetectRequest>,
) -> Result<Json<LanguageDetection>, ApiError> {
    if request.text.trim().is_empty() {
        return Err(ApiError::bad_request("text 不能为空"));
    }
    Ok(Json(state.orchestrator.detect_language(&request.text).await?))
}
