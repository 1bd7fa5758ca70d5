//! 生成任务路由

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use vidcast_core::models::{GenerationRequest, GenerationResult, JobProgress, JobStatus};
use vidcast_services::CostEstimate;

use crate::error::ApiError;
use crate::state::AppState;

const MAX_PROMPT_CHARS: usize = 2000;
const MAX_DURATION_SECS: u32 = 300;

#[derive(Debug, Serialize)]
pub struct CreateResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub message: String,
    pub websocket_url: String,
}

fn validate(request: &GenerationRequest) -> Result<(), ApiError> {
    if request.prompt.trim().is_empty() {
        return Err(ApiError::bad_request("prompt 不能为空"));
    }
    if request.prompt.chars().count() > MAX_PROMPT_CHARS {
        return Err(ApiError::bad_request(format!(
            "prompt 超过 {MAX_PROMPT_CHARS} 字符上限"
        )));
    }
    if request.duration == 0 || request.duration > MAX_DURATION_SECS {
        return Err(ApiError::bad_request(format!(
            "duration 必须在 1-{MAX_DURATION_SECS} 秒之间"
        )));
    }
    Ok(())
}

/// POST /api/generation/create
pub async fn create(
    State(state): State<AppState>,
    Json(request): Json<GenerationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate(&request)?;
    let job_id = state.orchestrator.generate(request);
    let websocket_url = format!("/ws/progress/{job_id}");
    Ok((
        StatusCode::ACCEPTED,
        Json(CreateResponse {
            job_id,
            status: JobStatus::Pending,
            message: "任务已接受".to_string(),
            websocket_url,
        }),
    ))
}

/// GET /api/generation/status/:job_id
pub async fn status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobProgress>, ApiError> {
    Ok(Json(state.tracker.get(&job_id)?))
}

/// GET /api/generation/result/:job_id
pub async fn result(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<GenerationResult>, ApiError> {
    Ok(Json(state.tracker.result(&job_id)?))
}

/// DELETE /api/generation/jobs/:job_id
pub async fn cancel(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.orchestrator.cancel(&job_id)?;
    Ok(Json(serde_json::json!({
        "job_id": job_id,
        "cancelled": true,
    })))
}

#[derive(Debug, Deserialize)]
pub struct EstimateQuery {
    #[serde(default = "default_duration")]
    pub duration: u32,
    #[serde(default = "default_resolution")]
    pub resolution: String,
    #[serde(default = "default_include_audio")]
    pub include_audio: bool,
}

fn default_duration() -> u32 {
    8
}

fn default_resolution() -> String {
    "720p".to_string()
}

fn default_include_audio() -> bool {
    true
}

/// GET /api/generation/estimate
pub async fn estimate(
    State(state): State<AppState>,
    Query(query): Query<EstimateQuery>,
) -> Result<Json<CostEstimate>, ApiError> {
    let mut request = GenerationRequest::new("estimate");
    request.duration = query.duration;
    request.resolution = query.resolution;
    request.include_audio = query.include_audio;
    Ok(Json(state.orchestrator.estimate(&request)?))
}
