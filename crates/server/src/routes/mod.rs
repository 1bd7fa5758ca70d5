//! 路由注册与全局中间件

use std::time::Duration;

use axum::http::HeaderValue;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tracing::warn;

use crate::state::AppState;

mod generation;
mod health;
mod language;
mod prompt;
mod providers;
mod voice;
mod ws;

/// 请求体上限（声音样本以 base64 内嵌上传）
const BODY_LIMIT_BYTES: usize = 50 * 1024 * 1024;
/// 同步接口整体超时
const REQUEST_TIMEOUT_SECS: u64 = 180;

/// 构建完整路由
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);
    let outputs_dir = state.config.outputs_dir();

    Router::new()
        .route("/health", get(health::health))
        .route("/api/generation/create", post(generation::create))
        .route("/api/generation/status/:job_id", get(generation::status))
        .route("/api/generation/result/:job_id", get(generation::result))
        .route("/api/generation/jobs/:job_id", delete(generation::cancel))
        .route("/api/generation/estimate", get(generation::estimate))
        .route("/api/providers", get(providers::list))
        .route(
            "/api/providers/recommendations",
            get(providers::recommendations),
        )
        .route("/api/providers/stats", get(providers::stats))
        .route("/api/prompt/enhance", post(prompt::enhance))
        .route("/api/language/detect", post(language::detect))
        .route("/api/voice/clone", post(voice::clone_voice))
        .route("/api/voice/tts", post(voice::tts))
        .route("/ws/progress/:job_id", get(ws::progress))
        .nest_service("/static/outputs", ServeDir::new(outputs_dir))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES))
        .layer(TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let mut parsed: Vec<HeaderValue> = Vec::with_capacity(origins.len());
    for origin in origins {
        match origin.parse() {
            Ok(value) => parsed.push(value),
            Err(_) => warn!(origin = %origin, "CORS 来源非法，忽略"),
        }
    }
    CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods(Any)
        .allow_headers(Any)
}
