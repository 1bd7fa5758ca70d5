//! 健康检查路由

use axum::extract::State;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": crate::version(),
        "providers": state.registry.list_providers(None, None).len(),
        "jobs_tracked": state.tracker.len(),
    }))
}
