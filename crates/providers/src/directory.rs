//! Provider 查找表
//!
//! 注册表负责「选哪个」，这里负责「怎么调」：描述符 ID 映射到具体
//! HTTP 适配器。只为已配置凭证的 Provider 构建客户端，选型链上
//! 没有客户端的 Provider 由编排器直接跳过。

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};
use vidcast_core::config::AppConfig;

use crate::language::{GoogleLanguageAdapter, LinguaHttpAdapter};
use crate::traits::{AdapterContext, LanguageProvider, VideoProvider, VoiceProvider};
use crate::video::{RunwayVideoAdapter, VeoVideoAdapter};
use crate::voice::{ElevenLabsAdapter, FishAudioAdapter};

/// Veo 风格提交协议的视频 Provider
const VEO_STYLE_VIDEO: &[&str] = &["veo_3.1", "sora_2"];
/// Runway 风格提交协议的视频 Provider
const RUNWAY_STYLE_VIDEO: &[&str] = &["runway_gen4", "runway_gen3_turbo"];

/// 描述符 ID 到具体实现的查找表
#[derive(Default)]
pub struct ProviderDirectory {
    video: HashMap<String, Arc<dyn VideoProvider>>,
    voice: HashMap<String, Arc<dyn VoiceProvider>>,
    language: HashMap<String, Arc<dyn LanguageProvider>>,
}

impl ProviderDirectory {
    /// 创建空查找表
    pub fn new() -> Self {
        Self::default()
    }

    /// 按配置构建查找表
    ///
    /// 凭证缺失的 Provider 不构建客户端；`lingua` 为自建服务无需凭证，
    /// 始终可用。
    pub fn from_config(config: &AppConfig) -> Self {
        let mut directory = Self::new();
        let outputs_dir = config.outputs_dir();

        for id in VEO_STYLE_VIDEO {
            let endpoint = config.provider_endpoint(id);
            if let Some(key) = endpoint.resolve_key() {
                directory.insert_video(
                    *id,
                    Arc::new(VeoVideoAdapter::new(
                        *id,
                        AdapterContext::new(endpoint.api_host.clone(), Some(key)),
                    )),
                );
            }
        }
        for id in RUNWAY_STYLE_VIDEO {
            let endpoint = config.provider_endpoint(id);
            if let Some(key) = endpoint.resolve_key() {
                directory.insert_video(
                    *id,
                    Arc::new(RunwayVideoAdapter::new(
                        *id,
                        AdapterContext::new(endpoint.api_host.clone(), Some(key)),
                    )),
                );
            }
        }

        let endpoint = config.provider_endpoint("fish_audio");
        if let Some(key) = endpoint.resolve_key() {
            directory.insert_voice(
                "fish_audio",
                Arc::new(FishAudioAdapter::new(
                    "fish_audio",
                    AdapterContext::new(endpoint.api_host.clone(), Some(key)),
                    outputs_dir.clone(),
                )),
            );
        }
        let endpoint = config.provider_endpoint("elevenlabs");
        if let Some(key) = endpoint.resolve_key() {
            directory.insert_voice(
                "elevenlabs",
                Arc::new(ElevenLabsAdapter::new(
                    "elevenlabs",
                    AdapterContext::new(endpoint.api_host.clone(), Some(key)),
                    outputs_dir.clone(),
                )),
            );
        }

        let endpoint = config.provider_endpoint("lingua");
        directory.insert_language(
            "lingua",
            Arc::new(LinguaHttpAdapter::new(
                "lingua",
                AdapterContext::new(endpoint.api_host.clone(), None),
            )),
        );
        let endpoint = config.provider_endpoint("google_cloud");
        if let Some(key) = endpoint.resolve_key() {
            directory.insert_language(
                "google_cloud",
                Arc::new(GoogleLanguageAdapter::new(
                    "google_cloud",
                    AdapterContext::new(endpoint.api_host.clone(), Some(key)),
                )),
            );
        }

        for id in config.providers.keys() {
            if !directory.has_client(id) {
                warn!(provider = %id, "已配置但无可用适配器或凭证，忽略");
            }
        }
        info!(
            video = directory.video.len(),
            voice = directory.voice.len(),
            language = directory.language.len(),
            "Provider 客户端已就绪"
        );
        directory
    }

    pub fn insert_video(&mut self, id: impl Into<String>, provider: Arc<dyn VideoProvider>) {
        self.video.insert(id.into(), provider);
    }

    pub fn insert_voice(&mut self, id: impl Into<String>, provider: Arc<dyn VoiceProvider>) {
        self.voice.insert(id.into(), provider);
    }

    pub fn insert_language(&mut self, id: impl Into<String>, provider: Arc<dyn LanguageProvider>) {
        self.language.insert(id.into(), provider);
    }

    /// 视频客户端
    pub fn video(&self, id: &str) -> Option<Arc<dyn VideoProvider>> {
        self.video.get(id).cloned()
    }

    /// 语音客户端
    pub fn voice(&self, id: &str) -> Option<Arc<dyn VoiceProvider>> {
        self.voice.get(id).cloned()
    }

    /// 语言检测客户端
    pub fn language(&self, id: &str) -> Option<Arc<dyn LanguageProvider>> {
        self.language.get(id).cloned()
    }

    fn has_client(&self, id: &str) -> bool {
        self.video.contains_key(id)
            || self.voice.contains_key(id)
            || self.language.contains_key(id)
    }
}
