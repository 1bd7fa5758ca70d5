//! API 数据模型
//!
//! 定义任务状态机、生成请求 / 结果与 Provider 产物等线上数据结构。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 生成任务状态
///
/// 状态机：pending → detecting_language → cloning_voice → generating_speech
/// → generating_video → merging → completed；任意步骤可转入 failed。
/// completed / failed 为吸收态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum JobStatus {
    /// 已接受，等待执行
    #[default]
    Pending,
    /// 语言检测中
    DetectingLanguage,
    /// 声音克隆中
    CloningVoice,
    /// 语音合成中
    GeneratingSpeech,
    /// 视频生成中
    GeneratingVideo,
    /// 音视频合成中
    Merging,
    /// 已完成
    Completed,
    /// 已失败（含取消）
    Failed,
}

impl JobStatus {
    /// 获取状态的线上标识
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::DetectingLanguage => "detecting_language",
            JobStatus::CloningVoice => "cloning_voice",
            JobStatus::GeneratingSpeech => "generating_speech",
            JobStatus::GeneratingVideo => "generating_video",
            JobStatus::Merging => "merging",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 检测到的语言信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageInfo {
    /// ISO 639-1 语言代码
    pub code: String,
    /// 语言名称
    pub name: String,
    /// 检测置信度（0-1）
    pub confidence: f64,
}

/// 语言检测结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageDetection {
    /// 最可能的语言
    pub detected_language: LanguageInfo,
    /// 备选语言
    #[serde(default)]
    pub alternatives: Vec<LanguageInfo>,
}

/// 待克隆的声音样本
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceSample {
    /// 克隆声音的名称
    pub name: String,
    /// 样本音频（base64 编码）
    pub audio_base64: String,
}

/// 生成请求
///
/// 提交一次 prompt 到视频的完整生成。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// 文本提示词（同时作为旁白文案）
    pub prompt: String,
    /// 目标视频时长（秒）
    #[serde(default = "default_duration")]
    pub duration: u32,
    /// 分辨率（720p / 1080p / 4k）
    #[serde(default = "default_resolution")]
    pub resolution: String,
    /// 画面比例（16:9 / 9:16 / 1:1）
    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: String,
    /// 视觉风格
    #[serde(default)]
    pub style: Option<String>,
    /// 已克隆声音的 ID
    #[serde(default)]
    pub voice_id: Option<String>,
    /// 待克隆的声音样本（提供时触发克隆步骤）
    #[serde(default)]
    pub voice_sample: Option<VoiceSample>,
    /// 是否在生成前做规则式提示词增强
    #[serde(default = "default_true")]
    pub enhance_prompt: bool,
    /// 是否自动检测提示词语言
    #[serde(default = "default_true")]
    pub detect_language: bool,
    /// 是否生成旁白音频
    #[serde(default = "default_true")]
    pub include_audio: bool,
}

fn default_duration() -> u32 {
    8
}

fn default_resolution() -> String {
    "720p".to_string()
}

fn default_aspect_ratio() -> String {
    "16:9".to_string()
}

fn default_true() -> bool {
    true
}

impl GenerationRequest {
    /// 创建最小请求
    pub fn new(prompt: &str) -> Self {
        Self {
            prompt: prompt.to_string(),
            duration: default_duration(),
            resolution: default_resolution(),
            aspect_ratio: default_aspect_ratio(),
            style: None,
            voice_id: None,
            voice_sample: None,
            enhance_prompt: true,
            detect_language: true,
            include_audio: true,
        }
    }

    /// 请求的分辨率是否需要 4K 支持
    pub fn requires_4k(&self) -> bool {
        matches!(self.resolution.to_lowercase().as_str(), "4k" | "2160p")
    }
}

/// 视频生成产物
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoArtifact {
    /// 视频地址
    pub video_url: String,
    /// 产物是否已带同步音轨
    #[serde(default)]
    pub has_audio: bool,
    /// 实际时长（秒）
    pub duration_seconds: f64,
    /// 分辨率
    pub resolution: String,
}

/// 语音合成产物
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioArtifact {
    /// 音频地址
    pub audio_url: String,
    /// 音频时长（秒）
    pub duration_seconds: f64,
    /// 音频格式
    pub format: String,
}

/// 声音克隆结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceCloneInfo {
    /// 克隆声音 ID
    pub voice_id: String,
    /// 名称
    pub name: String,
    /// 克隆状态（processing / ready / failed）
    pub status: String,
    /// 创建时间
    pub created_at: DateTime<Utc>,
}

/// 任务进度快照
///
/// 推送通道与拉取接口共用同一形状。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobProgress {
    /// 任务 ID
    pub job_id: String,
    /// 当前状态
    pub status: JobStatus,
    /// 完成百分比（0-100）
    pub progress: u8,
    /// 当前步骤描述
    pub current_step: String,
    /// 附加消息
    #[serde(default)]
    pub message: Option<String>,
    /// 失败原因
    #[serde(default)]
    pub error: Option<String>,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 最近更新时间
    pub updated_at: DateTime<Utc>,
}

impl JobProgress {
    /// 创建 pending 态的初始快照
    pub fn pending(job_id: &str) -> Self {
        let now = Utc::now();
        Self {
            job_id: job_id.to_string(),
            status: JobStatus::Pending,
            progress: 0,
            current_step: "初始化".to_string(),
            message: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// 生成最终结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    /// 任务 ID
    pub job_id: String,
    /// 终态状态
    pub status: JobStatus,
    /// 最终视频地址
    pub video_url: String,
    /// 旁白音频地址
    #[serde(default)]
    pub audio_url: Option<String>,
    /// 缩略图地址
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    /// 视频时长（秒）
    pub duration_seconds: f64,
    /// 检测到的语言
    #[serde(default)]
    pub detected_language: Option<LanguageInfo>,
    /// 处理耗时（秒）
    pub processing_time_seconds: f64,
    /// 成本估算
    #[serde(default)]
    pub cost_estimate: Option<f64>,
    /// 元数据（使用的 Provider、是否降级等）
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_status_wire_values() {
        assert_eq!(
            serde_json::to_string(&JobStatus::DetectingLanguage).unwrap(),
            "\"detecting_language\""
        );
        assert_eq!(
            serde_json::from_str::<JobStatus>("\"generating_video\"").unwrap(),
            JobStatus::GeneratingVideo
        );
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Merging.is_terminal());
    }

    #[test]
    fn test_request_defaults() {
        let request: GenerationRequest =
            serde_json::from_str(r#"{"prompt": "日出时分的山谷"}"#).unwrap();
        assert_eq!(request.duration, 8);
        assert_eq!(request.resolution, "720p");
        assert_eq!(request.aspect_ratio, "16:9");
        assert!(request.enhance_prompt);
        assert!(request.detect_language);
        assert!(request.include_audio);
        assert!(!request.requires_4k());
    }

    #[test]
    fn test_requires_4k() {
        let mut request = GenerationRequest::new("x");
        request.resolution = "4K".to_string();
        assert!(request.requires_4k());
        request.resolution = "2160p".to_string();
        assert!(request.requires_4k());
        request.resolution = "1080p".to_string();
        assert!(!request.requires_4k());
    }
}
