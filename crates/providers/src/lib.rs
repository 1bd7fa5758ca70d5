//! Provider 客户端模块
//!
//! 定义各能力类别的客户端 trait（每个类别一个能力方法），以及
//! 对接具体远程服务的 HTTP 适配器。
//!
//! ## 模块结构
//!
//! - `error` - 远程调用错误类型
//! - `traits` - 能力 trait 与适配器上下文
//! - `json_probe` - 响应 JSON 字段探测工具
//! - `video` - 文生视频适配器（Veo / Runway）
//! - `voice` - 声音克隆 / TTS 适配器（Fish Audio / ElevenLabs）
//! - `language` - 语言检测适配器（Lingua / Google Cloud）
//! - `directory` - 描述符 ID 到具体实现的查找表

mod directory;
mod error;
mod json_probe;
mod traits;

pub mod language;
pub mod video;
pub mod voice;

pub use directory::ProviderDirectory;
pub use error::{ProviderCallError, ProviderCallResult};
pub use json_probe::{
    extract_media_url, find_f64_value, find_i64_value, find_string_value, find_value_by_path,
    normalize_host, preview_payload,
};
pub use traits::{
    AdapterContext, LanguageProvider, VideoCallParams, VideoProvider, VoiceProvider,
};
