//! 声音克隆 / TTS 路由

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use vidcast_core::models::{AudioArtifact, VoiceCloneInfo};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CloneRequest {
    pub name: String,
    pub audio_base64: String,
}

/// POST /api/voice/clone
pub async fn clone_voice(
    State(state): State<AppState>,
    Json(request): Json<CloneRequest>,
) -> Result<Json<VoiceCloneInfo>, ApiError> {
    if request.name.trim().is_empty() {
        return Err(ApiError::bad_request("name 不能为空"));
    }
    if request.audio_base64.trim().is_empty() {
        return Err(ApiError::bad_request("audio_base64 不能为空"));
    }
    let info = state
        .orchestrator
        .clone_voice(&request.audio_base64, &request.name)
        .await?;
    Ok(Json(info))
}

#[derive(Debug, Deserialize)]
pub struct TtsRequest {
    pub text: String,
    #[serde(default)]
    pub voice_id: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default = "default_speed")]
    pub speed: f64,
}

fn default_speed() -> f64 {
    1.0
}

/// POST /api/voice/tts
pub async fn tts(
    State(state): State<AppState>,
    Json(request): Json<TtsRequest>,
) -> Result<Json<AudioArtifact>, ApiError> {
    if request.text.trim().is_empty() {
        return Err(ApiError::bad_request("text 不能为空"));
    }
    if !(0.5..=2.0).contains(&request.speed) {
        return Err(ApiError::bad_request("speed 必须在 0.5-2.0 之间"));
    }
    let artifact = state
        .orchestrator
        .synthesize(
            &request.text,
            request.voice_id.as_deref(),
            request.language.as_deref(),
            request.speed,
        )
        .await?;
    Ok(Json(artifact))
}
