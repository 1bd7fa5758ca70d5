//! API 路由集成测试
//!
//! 不触达远程 Provider：查找表留空，仅覆盖路由、校验与错误映射。

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use vidcast_core::config::AppConfig;
use vidcast_core::jobs::JobTracker;
use vidcast_core::models::JobStatus;
use vidcast_core::registry::ProviderRegistry;
use vidcast_providers::ProviderDirectory;
use vidcast_server::{build_router, AppState};
use vidcast_services::Orchestrator;
use vidcast_websocket::ConnectionManager;

fn test_app() -> (Router, AppState) {
    let registry = Arc::new(ProviderRegistry::with_builtin_catalog());
    let tracker = Arc::new(JobTracker::new());
    let connections = Arc::new(ConnectionManager::new());
    let mut config = AppConfig::default();
    config.storage_path = Some(std::env::temp_dir().join("vidcast-server-tests"));
    let config = Arc::new(config);

    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&registry),
        Arc::new(ProviderDirectory::new()),
        Arc::clone(&tracker),
        connections.clone(),
        Arc::clone(&config),
    ));

    let state = AppState {
        orchestrator,
        registry,
        tracker,
        connections,
        config,
    };
    (build_router(state.clone()), state)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health() {
    let (app, _) = test_app();
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_create_rejects_empty_prompt() {
    let (app, _) = test_app();
    let request = Request::post("/api/generation/create")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "prompt": "   " }).to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("prompt"));
}

#[tokio::test]
async fn test_create_rejects_out_of_range_duration() {
    let (app, _) = test_app();
    let request = Request::post("/api/generation/create")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "prompt": "海边日落", "duration": 0 }).to_string(),
        ))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_status_unknown_job_is_404() {
    let (app, _) = test_app();
    let response = app
        .oneshot(
            Request::get("/api/generation/status/no-such-job")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_result_unfinished_job_is_conflict() {
    let (app, state) = test_app();
    state.tracker.insert("job-pending");

    let response = app
        .oneshot(
            Request::get("/api/generation/result/job-pending")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_result_failed_job_carries_error() {
    let (app, state) = test_app();
    state.tracker.insert("job-failed");
    state.tracker.update(
        "job-failed",
        JobStatus::Failed,
        0,
        "失败",
        None,
        Some("provider 全部失败".to_string()),
    );

    let response = app
        .oneshot(
            Request::get("/api/generation/result/job-failed")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("provider 全部失败"));
}

#[tokio::test]
async fn test_list_providers_with_category_filter() {
    let (app, _) = test_app();
    let response = app
        .oneshot(
            Request::get("/api/providers?category=video")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert!(body["count"].as_u64().unwrap() > 0);
    for provider in body["providers"].as_array().unwrap() {
        assert_eq!(provider["category"], "video");
    }
}

#[tokio::test]
async fn test_list_providers_unknown_category_is_400() {
    let (app, _) = test_app();
    let response = app
        .oneshot(
            Request::get("/api/providers?category=music")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_recommendations_known_use_case() {
    let (app, _) = test_app();
    let response = app
        .oneshot(
            Request::get("/api/providers/recommendations?use_case=cinematic")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert!(body["best"].as_str().is_some());
    assert!(body["alternative"].as_str().is_some());
}

#[tokio::test]
async fn test_estimate_uses_builtin_catalog() {
    let (app, _) = test_app();
    let response = app
        .oneshot(
            Request::get("/api/generation/estimate?duration=10&resolution=1080p")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert!(body["total"].as_f64().unwrap() > 0.0);
    assert!(body["video_provider"].as_str().is_some());
}

#[tokio::test]
async fn test_prompt_enhance_appends_style_tags() {
    let (app, _) = test_app();
    let request = Request::post("/api/prompt/enhance")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "prompt": "海边日落", "style": "cinematic" }).to_string(),
        ))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["original"], "海边日落");
    let enhanced = body["enhanced"].as_str().unwrap();
    assert!(enhanced.starts_with("海边日落"));
    assert!(enhanced.contains("cinematic lighting"));
    assert!(!body["additions"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_prompt_enhance_rejects_empty_prompt() {
    let (app, _) = test_app();
    let request = Request::post("/api/prompt/enhance")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "prompt": "  " }).to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_tts_rejects_out_of_range_speed() {
    let (app, _) = test_app();
    let request = Request::post("/api/voice/tts")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "text": "你好", "speed": 3.0 }).to_string(),
        ))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_language_detect_rejects_empty_text() {
    let (app, _) = test_app();
    let request = Request::post("/api/language/detect")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "text": "" }).to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
