//! 提示词增强路由

use axum::Json;
use serde::Deserialize;
use vidcast_services::{EnhancedPrompt, PromptEnhancer};

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct EnhanceRequest {
    pub prompt: String,
    #[serde(default)]
    pub style: Option<String>,
}

/// POST /api/prompt/enhance
pub async fn enhance(
    Json(request): Json<EnhanceRequest>,
) -> Result<Json<EnhancedPrompt>, ApiError> {
    if request.prompt.trim().is_empty() {
        return Err(ApiError::bad_request("prompt 不能为空"));
    }
    Ok(Json(
        PromptEnhancer.enhance(&request.prompt, request.style.as_deref()),
    ))
}
