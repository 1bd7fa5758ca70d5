//! 声音克隆 / TTS 适配器
//!
//! 语音服务直接返回音频字节流，适配器负责落盘到产物目录，
//! 并返回可被静态服务访问的 `/static/outputs/` URL。

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;
use vidcast_core::models::AudioArtifact;

use crate::error::{ProviderCallError, ProviderCallResult};
use crate::json_probe::{find_string_value, normalize_host, preview_payload};
use crate::traits::{AdapterContext, VoiceProvider};

const DEFAULT_FISH_HOST: &str = "https://api.fish.audio";
const DEFAULT_ELEVENLABS_HOST: &str = "https://api.elevenlabs.io";

/// 将音频字节写入产物目录，返回静态服务 URL
async fn store_audio(outputs_dir: &Path, bytes: &[u8], format: &str) -> ProviderCallResult<String> {
    let filename = format!("speech_{}.{format}", Uuid::new_v4());
    let path = outputs_dir.join(&filename);
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|error| ProviderCallError::Payload(format!("音频写入失败: {error}")))?;
    Ok(format!("/static/outputs/{filename}"))
}

/// 上传前校验样本是合法 base64 且非空
fn validate_sample(sample_base64: &str) -> ProviderCallResult<()> {
    let decoded = BASE64
        .decode(sample_base64.trim())
        .map_err(|error| ProviderCallError::Payload(format!("声音样本不是合法 base64: {error}")))?;
    if decoded.is_empty() {
        return Err(ProviderCallError::Payload("声音样本为空".to_string()));
    }
    Ok(())
}

async fn read_error_payload(response: reqwest::Response) -> ProviderCallError {
    let status = response.status().as_u16();
    let payload = response.text().await.unwrap_or_default();
    ProviderCallError::Status {
        status,
        payload: preview_payload(&payload),
    }
}

/// Fish Audio 适配器
pub struct FishAudioAdapter {
    id: String,
    client: Client,
    context: AdapterContext,
    outputs_dir: PathBuf,
}

impl FishAudioAdapter {
    pub fn new(id: impl Into<String>, context: AdapterContext, outputs_dir: PathBuf) -> Self {
        Self {
            id: id.into(),
            client: Client::new(),
            context,
            outputs_dir,
        }
    }

    fn base_url(&self) -> String {
        normalize_host(&self.context.api_host, DEFAULT_FISH_HOST)
    }
}

#[async_trait]
impl VoiceProvider for FishAudioAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    async fn clone_voice(&self, sample_base64: &str, name: &str) -> ProviderCallResult<String> {
        let api_key = self.context.require_key(&self.id)?;
        validate_sample(sample_base64)?;
        let endpoint = format!("{}/model", self.base_url());

        let body = json!({
            "title": name,
            "type": "tts",
            "train_mode": "fast",
            "voices": [sample_base64],
        });

        let response = self
            .client
            .post(endpoint)
            .header(AUTHORIZATION, format!("Bearer {api_key}"))
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(read_error_payload(response).await);
        }
        let value: Value = response
            .json()
            .await
            .map_err(|error| ProviderCallError::Payload(error.to_string()))?;
        find_string_value(&value, &["_id", "id", "model_id"])
            .ok_or_else(|| ProviderCallError::Payload("响应缺少声音模型 ID".to_string()))
    }

    async fn synthesize(
        &self,
        text: &str,
        voice_id: Option<&str>,
        language: Option<&str>,
        speed: f64,
    ) -> ProviderCallResult<AudioArtifact> {
        let api_key = self.context.require_key(&self.id)?;
        let endpoint = format!("{}/v1/tts", self.base_url());

        let mut body = json!({
            "text": text,
            "format": "mp3",
            "prosody": { "speed": speed },
        });
        if let Some(voice_id) = voice_id {
            body["reference_id"] = json!(voice_id);
        }
        if let Some(language) = language {
            body["language"] = json!(language);
        }

        let response = self
            .client
            .post(endpoint)
            .header(AUTHORIZATION, format!("Bearer {api_key}"))
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(read_error_payload(response).await);
        }
        let bytes = response.bytes().await?;
        debug!(provider = %self.id, size = bytes.len(), "语音合成完成");

        let audio_url = store_audio(&self.outputs_dir, &bytes, "mp3").await?;
        Ok(AudioArtifact {
            audio_url,
            duration_seconds: 0.0,
            format: "mp3".to_string(),
        })
    }
}

/// ElevenLabs 适配器
pub struct ElevenLabsAdapter {
    id: String,
    client: Client,
    context: AdapterContext,
    outputs_dir: PathBuf,
}

impl ElevenLabsAdapter {
    /// 未指定 voice_id 时使用的默认声音（Rachel）
    const DEFAULT_VOICE: &'static str = "21m00Tcm4TlvDq8ikWAM";

    pub fn new(id: impl Into<String>, context: AdapterContext, outputs_dir: PathBuf) -> Self {
        Self {
            id: id.into(),
            client: Client::new(),
            context,
            outputs_dir,
        }
    }

    fn base_url(&self) -> String {
        normalize_host(&self.context.api_host, DEFAULT_ELEVENLABS_HOST)
    }
}

#[async_trait]
impl VoiceProvider for ElevenLabsAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    async fn clone_voice(&self, sample_base64: &str, name: &str) -> ProviderCallResult<String> {
        let api_key = self.context.require_key(&self.id)?;
        validate_sample(sample_base64)?;
        let endpoint = format!("{}/v1/voices/add", self.base_url());

        let body = json!({
            "name": name,
            "files": [sample_base64],
        });

        let response = self
            .client
            .post(endpoint)
            .header("xi-api-key", api_key)
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(read_error_payload(response).await);
        }
        let value: Value = response
            .json()
            .await
            .map_err(|error| ProviderCallError::Payload(error.to_string()))?;
        find_string_value(&value, &["voice_id", "id"])
            .ok_or_else(|| ProviderCallError::Payload("响应缺少 voice_id".to_string()))
    }

    async fn synthesize(
        &self,
        text: &str,
        voice_id: Option<&str>,
        _language: Option<&str>,
        speed: f64,
    ) -> ProviderCallResult<AudioArtifact> {
        let api_key = self.context.require_key(&self.id)?;
        let voice = voice_id.unwrap_or(Self::DEFAULT_VOICE);
        let endpoint = format!("{}/v1/text-to-speech/{voice}", self.base_url());

        let body = json!({
            "text": text,
            "model_id": "eleven_multilingual_v2",
            "voice_settings": {
                "stability": 0.5,
                "similarity_boost": 0.75,
                "speed": speed,
            },
        });

        let response = self
            .client
            .post(endpoint)
            .header("xi-api-key", api_key)
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(read_error_payload(response).await);
        }
        let bytes = response.bytes().await?;
        debug!(provider = %self.id, size = bytes.len(), "语音合成完成");

        let audio_url = store_audio(&self.outputs_dir, &bytes, "mp3").await?;
        Ok(AudioArtifact {
            audio_url,
            duration_seconds: 0.0,
            format: "mp3".to_string(),
        })
    }
}
