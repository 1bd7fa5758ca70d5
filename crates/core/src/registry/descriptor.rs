//! Provider 描述符定义
//!
//! 定义 Provider 的类别、质量等级与静态元数据。描述符在进程启动时从
//! 配置注册，注册之后不再修改。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Provider 类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderCategory {
    /// 文生视频
    Video,
    /// 声音克隆 / TTS
    Voice,
    /// 语言检测
    Language,
}

impl ProviderCategory {
    /// 获取类别的线上标识
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderCategory::Video => "video",
            ProviderCategory::Voice => "voice",
            ProviderCategory::Language => "language",
        }
    }

    /// 从字符串解析
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "video" => Some(ProviderCategory::Video),
            "voice" => Some(ProviderCategory::Voice),
            "language" => Some(ProviderCategory::Language),
            _ => None,
        }
    }

    /// 获取所有类别
    pub fn all() -> &'static [ProviderCategory] {
        &[
            ProviderCategory::Video,
            ProviderCategory::Voice,
            ProviderCategory::Language,
        ]
    }
}

impl std::fmt::Display for ProviderCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 质量等级
///
/// 按 quality_score 派生的分档，用于构建降级链。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    /// 最佳质量，成本最高
    Premium,
    /// 质量与成本均衡
    Standard,
    /// 可接受质量，成本最低
    Budget,
}

impl QualityTier {
    /// 获取等级的显示名称
    pub fn display_name(&self) -> &'static str {
        match self {
            QualityTier::Premium => "premium",
            QualityTier::Standard => "standard",
            QualityTier::Budget => "budget",
        }
    }

    /// 解析等级标识
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "premium" => Some(QualityTier::Premium),
            "standard" => Some(QualityTier::Standard),
            "budget" => Some(QualityTier::Budget),
            _ => None,
        }
    }

    /// 按降级顺序排列的所有等级
    pub fn ordered() -> &'static [QualityTier] {
        &[
            QualityTier::Premium,
            QualityTier::Standard,
            QualityTier::Budget,
        ]
    }

    /// 从质量分派生等级
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            QualityTier::Premium
        } else if score >= 80.0 {
            QualityTier::Standard
        } else {
            QualityTier::Budget
        }
    }
}

impl std::fmt::Display for QualityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Provider 描述符
///
/// 单个 Provider 的静态元数据，注册后不可变。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    /// Provider ID
    pub id: String,
    /// 类别
    pub category: ProviderCategory,
    /// 质量分（0-100，越高越好）
    pub quality_score: f64,
    /// 单位成本（视频按秒，语音按 1k 字符）
    pub cost_per_unit: f64,
    /// 是否原生生成音频
    #[serde(default)]
    pub supports_audio: bool,
    /// 是否支持 4K 分辨率
    #[serde(default)]
    pub supports_4k: bool,
    /// 最大视频时长（秒）
    #[serde(default)]
    pub max_duration: Option<u32>,
    /// 支持的语言代码
    #[serde(default)]
    pub languages: Vec<String>,
    /// 额外特性标记
    #[serde(default)]
    pub features: HashMap<String, serde_json::Value>,
    /// 是否可用
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl ProviderDescriptor {
    /// 创建新的描述符
    pub fn new(id: &str, category: ProviderCategory, quality_score: f64) -> Self {
        Self {
            id: id.to_string(),
            category,
            quality_score,
            cost_per_unit: 0.0,
            supports_audio: false,
            supports_4k: false,
            max_duration: None,
            languages: Vec::new(),
            features: HashMap::new(),
            enabled: true,
        }
    }

    /// 设置单位成本
    pub fn with_cost(mut self, cost_per_unit: f64) -> Self {
        self.cost_per_unit = cost_per_unit;
        self
    }

    /// 设置原生音频能力
    pub fn with_audio(mut self, supports: bool) -> Self {
        self.supports_audio = supports;
        self
    }

    /// 设置 4K 能力
    pub fn with_4k(mut self, supports: bool) -> Self {
        self.supports_4k = supports;
        self
    }

    /// 设置最大时长
    pub fn with_max_duration(mut self, seconds: u32) -> Self {
        self.max_duration = Some(seconds);
        self
    }

    /// 设置支持的语言
    pub fn with_languages(mut self, codes: &[&str]) -> Self {
        self.languages = codes.iter().map(|c| c.to_string()).collect();
        self
    }

    /// 添加特性标记
    pub fn with_feature(mut self, key: &str, value: serde_json::Value) -> Self {
        self.features.insert(key.to_string(), value);
        self
    }

    /// 派生质量等级
    pub fn tier(&self) -> QualityTier {
        QualityTier::from_score(self.quality_score)
    }
}

/// 选择约束
///
/// 硬约束用于过滤候选集合；`prefer_native_audio` 是软约束，仅在
/// 存在满足者时收窄集合，否则不生效。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectionConstraints {
    /// 必须支持 4K（硬约束）
    #[serde(default)]
    pub requires_4k: bool,
    /// 单位成本上限（硬约束）
    #[serde(default)]
    pub max_cost_per_unit: Option<f64>,
    /// 必须支持的最短时长（硬约束）
    #[serde(default)]
    pub min_duration_support: Option<u32>,
    /// 必须支持的语言（硬约束，仅对声明了语言列表的 Provider 生效）
    #[serde(default)]
    pub required_language: Option<String>,
    /// 优先选择原生音频 Provider（软约束）
    #[serde(default)]
    pub prefer_native_audio: bool,
}

impl SelectionConstraints {
    /// 创建空约束
    pub fn none() -> Self {
        Self::default()
    }

    /// 要求 4K 支持
    pub fn with_4k(mut self) -> Self {
        self.requires_4k = true;
        self
    }

    /// 设置成本上限
    pub fn with_max_cost(mut self, max: f64) -> Self {
        self.max_cost_per_unit = Some(max);
        self
    }

    /// 设置最短时长支持
    pub fn with_min_duration(mut self, seconds: u32) -> Self {
        self.min_duration_support = Some(seconds);
        self
    }

    /// 设置必须支持的语言
    pub fn with_language(mut self, code: &str) -> Self {
        self.required_language = Some(code.to_string());
        self
    }

    /// 偏好原生音频
    pub fn prefer_audio(mut self) -> Self {
        self.prefer_native_audio = true;
        self
    }

    /// 判断描述符是否满足所有硬约束
    pub fn satisfied_by(&self, descriptor: &ProviderDescriptor) -> bool {
        if self.requires_4k && !descriptor.supports_4k {
            return false;
        }
        if let Some(max_cost) = self.max_cost_per_unit {
            if descriptor.cost_per_unit > max_cost {
                return false;
            }
        }
        if let Some(min_duration) = self.min_duration_support {
            if let Some(max) = descriptor.max_duration {
                if max < min_duration {
                    return false;
                }
            }
        }
        if let Some(code) = &self.required_language {
            if !descriptor.languages.is_empty()
                && !descriptor.languages.iter().any(|l| l == code)
            {
                return false;
            }
        }
        true
    }
}

/// 推荐用例
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UseCase {
    /// 电影级画面
    Cinematic,
    /// 写实 / 物理一致性
    Realism,
    /// 创意控制
    Creative,
    /// 批量生产
    Volume,
    /// 低成本
    Budget,
}

impl UseCase {
    /// 从字符串解析
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cinematic" => Some(UseCase::Cinematic),
            "realism" => Some(UseCase::Realism),
            "creative" => Some(UseCase::Creative),
            "volume" => Some(UseCase::Volume),
            "budget" => Some(UseCase::Budget),
            _ => None,
        }
    }
}

/// 用例推荐结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    /// 首选 Provider ID
    pub best: String,
    /// 备选 Provider ID
    pub alternative: String,
    /// 推荐理由
    pub reason: String,
}
