//! 能力 trait 与适配器上下文
//!
//! 每个能力类别一个 trait，编排器只面向 trait 编程；
//! 注册表选型得到的描述符 ID 经查找表解析为这里的具体实现。

use crate::error::{ProviderCallError, ProviderCallResult};
use async_trait::async_trait;
use vidcast_core::models::{AudioArtifact, LanguageDetection, VideoArtifact};

/// 适配器上下文：接入地址与凭证
#[derive(Debug, Clone, Default)]
pub struct AdapterContext {
    /// API 地址（留空使用适配器默认值）
    pub api_host: String,
    /// API Key
    pub api_key: Option<String>,
}

impl AdapterContext {
    pub fn new(api_host: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            api_host: api_host.into(),
            api_key,
        }
    }

    /// 取出非空 API Key，未配置时报 Unavailable
    pub fn require_key(&self, provider: &str) -> ProviderCallResult<String> {
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ProviderCallError::Unavailable(format!("{provider} 未配置 API Key")))
    }
}

/// 一次视频生成调用的参数
#[derive(Debug, Clone)]
pub struct VideoCallParams {
    /// 提示词
    pub prompt: String,
    /// 目标时长（秒）
    pub duration: u32,
    /// 分辨率（720p / 1080p / 4k）
    pub resolution: String,
    /// 画面比例
    pub aspect_ratio: String,
    /// 视觉风格
    pub style: Option<String>,
    /// 是否请求原生音频
    pub include_audio: bool,
}

/// 文生视频能力
#[async_trait]
pub trait VideoProvider: Send + Sync {
    /// 适配器标识（与描述符 ID 一致）
    fn id(&self) -> &str;

    /// 提交生成并等待产物就绪
    async fn generate(&self, params: &VideoCallParams) -> ProviderCallResult<VideoArtifact>;
}

/// 声音克隆 / 语音合成能力
#[async_trait]
pub trait VoiceProvider: Send + Sync {
    fn id(&self) -> &str;

    /// 用音频样本克隆声音，返回可复用的 voice_id
    async fn clone_voice(&self, sample_base64: &str, name: &str) -> ProviderCallResult<String>;

    /// 合成语音
    async fn synthesize(
        &self,
        text: &str,
        voice_id: Option<&str>,
        language: Option<&str>,
        speed: f64,
    ) -> ProviderCallResult<AudioArtifact>;
}

/// 语言检测能力
#[async_trait]
pub trait LanguageProvider: Send + Sync {
    fn id(&self) -> &str;

    /// 检测文本语言
    async fn detect(&self, text: &str) -> ProviderCallResult<LanguageDetection>;
}
