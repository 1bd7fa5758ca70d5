//! 文生视频适配器
//!
//! 远程视频服务统一为「提交任务 + 轮询状态」两段式调用，
//! `generate` 在内部完成整个生命周期；整体截止时间由调用方控制。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde_json::{Map, Value};
use tracing::debug;
use vidcast_core::models::VideoArtifact;

use crate::error::{ProviderCallError, ProviderCallResult};
use crate::json_probe::{
    extract_media_url, find_i64_value, find_string_value, normalize_host, preview_payload,
};
use crate::traits::{AdapterContext, VideoCallParams, VideoProvider};

const DEFAULT_VEO_HOST: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_RUNWAY_HOST: &str = "https://api.dev.runwayml.com/v1";
const POLL_INTERVAL_SECS: u64 = 5;

/// 远程任务轮询快照
#[derive(Debug, Clone)]
struct RemoteTaskStatus {
    state: RemoteTaskState,
    progress: Option<i64>,
    video_url: Option<String>,
    error_message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RemoteTaskState {
    Processing,
    Success,
    Error,
}

/// 远程服务的状态字面值千奇百怪，按关键词归一化
fn normalize_remote_status(raw_status: &str) -> RemoteTaskState {
    let normalized = raw_status.trim().to_uppercase();
    if normalized.contains("SUCCEED")
        || normalized.contains("SUCCESS")
        || normalized == "DONE"
        || normalized == "COMPLETED"
    {
        return RemoteTaskState::Success;
    }
    if normalized.contains("FAIL") || normalized.contains("ERROR") || normalized.contains("CANCEL")
    {
        return RemoteTaskState::Error;
    }
    RemoteTaskState::Processing
}

fn parse_task_status(value: &Value) -> RemoteTaskStatus {
    let raw_status = find_string_value(
        value,
        &["status", "state", "task_status", "output.task_status"],
    )
    .unwrap_or_default();
    let state = normalize_remote_status(&raw_status);
    RemoteTaskStatus {
        state,
        progress: find_i64_value(value, &["progress", "output.progress", "percent"]),
        video_url: extract_media_url(value),
        error_message: find_string_value(
            value,
            &["error", "error_message", "failure_reason", "message", "msg"],
        ),
    }
}

/// 读取响应体并统一非成功状态码的错误形态
async fn read_payload(response: reqwest::Response) -> ProviderCallResult<Value> {
    let status = response.status();
    let payload = response.text().await?;
    if !status.is_success() {
        return Err(ProviderCallError::Status {
            status: status.as_u16(),
            payload: preview_payload(&payload),
        });
    }
    serde_json::from_str(&payload).map_err(|error| ProviderCallError::Payload(error.to_string()))
}

/// 轮询直到远程任务终结；整体超时由编排器负责
async fn poll_until_done<F, Fut>(provider: &str, query: F) -> ProviderCallResult<VideoArtifact>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = ProviderCallResult<RemoteTaskStatus>>,
{
    loop {
        tokio::time::sleep(Duration::from_secs(POLL_INTERVAL_SECS)).await;
        let status = query().await?;
        debug!(
            provider = %provider,
            state = ?status.state,
            progress = ?status.progress,
            "视频任务轮询"
        );
        match status.state {
            RemoteTaskState::Success => {
                let video_url = status.video_url.ok_or_else(|| {
                    ProviderCallError::Payload("任务成功但响应缺少视频 URL".to_string())
                })?;
                return Ok(VideoArtifact {
                    video_url,
                    has_audio: false,
                    duration_seconds: 0.0,
                    resolution: String::new(),
                });
            }
            RemoteTaskState::Error => {
                return Err(ProviderCallError::TaskFailed(
                    status
                        .error_message
                        .unwrap_or_else(|| "远程未返回错误信息".to_string()),
                ));
            }
            RemoteTaskState::Processing => {}
        }
    }
}

/// Google Veo 适配器
pub struct VeoVideoAdapter {
    id: String,
    client: Client,
    context: AdapterContext,
    supports_audio: bool,
}

impl VeoVideoAdapter {
    pub fn new(id: impl Into<String>, context: AdapterContext) -> Self {
        Self {
            id: id.into(),
            client: Client::new(),
            context,
            supports_audio: true,
        }
    }

    fn base_url(&self) -> String {
        normalize_host(&self.context.api_host, DEFAULT_VEO_HOST)
    }

    async fn submit(&self, params: &VideoCallParams) -> ProviderCallResult<String> {
        let api_key = self.context.require_key(&self.id)?;
        let endpoint = format!("{}/video/generations", self.base_url());

        let mut body = Map::new();
        body.insert("model".to_string(), Value::String(self.id.clone()));
        body.insert("prompt".to_string(), Value::String(params.prompt.clone()));
        body.insert(
            "duration_seconds".to_string(),
            Value::Number(params.duration.into()),
        );
        body.insert(
            "aspect_ratio".to_string(),
            Value::String(params.aspect_ratio.clone()),
        );
        body.insert(
            "resolution".to_string(),
            Value::String(params.resolution.clone()),
        );
        body.insert(
            "generate_audio".to_string(),
            Value::Bool(params.include_audio),
        );
        if let Some(style) = &params.style {
            if !style.trim().is_empty() {
                body.insert("style".to_string(), Value::String(style.clone()));
            }
        }

        let response = self
            .client
            .post(endpoint)
            .header(AUTHORIZATION, format!("Bearer {api_key}"))
            .header(CONTENT_TYPE, "application/json")
            .json(&Value::Object(body))
            .send()
            .await?;

        let value = read_payload(response).await?;
        find_string_value(&value, &["id", "task_id", "name"])
            .ok_or_else(|| ProviderCallError::Payload("响应缺少任务 ID".to_string()))
    }

    async fn query(&self, task_id: &str) -> ProviderCallResult<RemoteTaskStatus> {
        let api_key = self.context.require_key(&self.id)?;
        let endpoint = format!("{}/video/generations/{task_id}", self.base_url());
        let response = self
            .client
            .get(endpoint)
            .header(AUTHORIZATION, format!("Bearer {api_key}"))
            .send()
            .await?;
        let value = read_payload(response).await?;
        Ok(parse_task_status(&value))
    }
}

#[async_trait]
impl VideoProvider for VeoVideoAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    async fn generate(&self, params: &VideoCallParams) -> ProviderCallResult<VideoArtifact> {
        let task_id = self.submit(params).await?;
        debug!(provider = %self.id, task_id = %task_id, "视频任务已提交");
        let mut artifact = poll_until_done(&self.id, || self.query(&task_id)).await?;
        artifact.has_audio = self.supports_audio && params.include_audio;
        artifact.duration_seconds = f64::from(params.duration);
        artifact.resolution = params.resolution.clone();
        Ok(artifact)
    }
}

/// Runway 适配器
pub struct RunwayVideoAdapter {
    id: String,
    client: Client,
    context: AdapterContext,
}

impl RunwayVideoAdapter {
    pub fn new(id: impl Into<String>, context: AdapterContext) -> Self {
        Self {
            id: id.into(),
            client: Client::new(),
            context,
        }
    }

    fn base_url(&self) -> String {
        normalize_host(&self.context.api_host, DEFAULT_RUNWAY_HOST)
    }

    async fn submit(&self, params: &VideoCallParams) -> ProviderCallResult<String> {
        let api_key = self.context.require_key(&self.id)?;
        let endpoint = format!("{}/text_to_video", self.base_url());

        let mut body = Map::new();
        body.insert("model".to_string(), Value::String(self.id.clone()));
        body.insert(
            "promptText".to_string(),
            Value::String(params.prompt.clone()),
        );
        body.insert("duration".to_string(), Value::Number(params.duration.into()));
        body.insert("ratio".to_string(), Value::String(runway_ratio(params)));
        if let Some(style) = &params.style {
            if !style.trim().is_empty() {
                body.insert("style".to_string(), Value::String(style.clone()));
            }
        }

        let response = self
            .client
            .post(endpoint)
            .header(AUTHORIZATION, format!("Bearer {api_key}"))
            .header("X-Runway-Version", "2024-11-06")
            .header(CONTENT_TYPE, "application/json")
            .json(&Value::Object(body))
            .send()
            .await?;

        let value = read_payload(response).await?;
        find_string_value(&value, &["id", "task_id"])
            .ok_or_else(|| ProviderCallError::Payload("响应缺少任务 ID".to_string()))
    }

    async fn query(&self, task_id: &str) -> ProviderCallResult<RemoteTaskStatus> {
        let api_key = self.context.require_key(&self.id)?;
        let endpoint = format!("{}/tasks/{task_id}", self.base_url());
        let response = self
            .client
            .get(endpoint)
            .header(AUTHORIZATION, format!("Bearer {api_key}"))
            .header("X-Runway-Version", "2024-11-06")
            .send()
            .await?;
        let value = read_payload(response).await?;
        Ok(parse_task_status(&value))
    }
}

/// Runway 按「宽x高」接收比例
fn runway_ratio(params: &VideoCallParams) -> String {
    let is_hd = matches!(params.resolution.to_lowercase().as_str(), "1080p" | "4k" | "2160p");
    match (params.aspect_ratio.as_str(), is_hd) {
        ("9:16", true) => "1080:1920",
        ("9:16", false) => "720:1280",
        ("1:1", true) => "1080:1080",
        ("1:1", false) => "960:960",
        (_, true) => "1920:1080",
        (_, false) => "1280:720",
    }
    .to_string()
}

#[async_trait]
impl VideoProvider for RunwayVideoAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    async fn generate(&self, params: &VideoCallParams) -> ProviderCallResult<VideoArtifact> {
        let task_id = self.submit(params).await?;
        debug!(provider = %self.id, task_id = %task_id, "视频任务已提交");
        let mut artifact = poll_until_done(&self.id, || self.query(&task_id)).await?;
        // Runway 不产出原生音频
        artifact.has_audio = false;
        artifact.duration_seconds = f64::from(params.duration);
        artifact.resolution = params.resolution.clone();
        Ok(artifact)
    }
}
