//! Provider 查询路由

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use vidcast_core::registry::{ProviderCategory, QualityTier, Recommendation, UseCase};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
    pub tier: Option<String>,
}

/// GET /api/providers
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let category = query
        .category
        .as_deref()
        .map(|s| {
            ProviderCategory::parse(s)
                .ok_or_else(|| ApiError::bad_request(format!("未知类别: {s}")))
        })
        .transpose()?;
    let tier = query
        .tier
        .as_deref()
        .map(|s| {
            QualityTier::parse(s).ok_or_else(|| ApiError::bad_request(format!("未知等级: {s}")))
        })
        .transpose()?;

    let providers = state.registry.list_providers(category, tier);
    Ok(Json(json!({
        "count": providers.len(),
        "providers": providers,
    })))
}

#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    pub use_case: String,
}

/// GET /api/providers/recommendations
pub async fn recommendations(
    State(state): State<AppState>,
    Query(query): Query<RecommendationQuery>,
) -> Result<Json<Recommendation>, ApiError> {
    let use_case = UseCase::parse(&query.use_case)
        .ok_or_else(|| ApiError::bad_request(format!("未知用例: {}", query.use_case)))?;
    Ok(Json(state.registry.get_recommendations(use_case)))
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub provider_id: Option<String>,
}

/// GET /api/providers/stats
pub async fn stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Json<serde_json::Value> {
    let stats = state.registry.usage_stats(query.provider_id.as_deref());
    Json(json!({ "stats": stats }))
}
