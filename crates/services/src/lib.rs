//! 业务服务模块
//!
//! - `orchestrator` - 生成流水线编排（选型、降级、超时、进度）
//! - `media` - ffmpeg 音视频后处理
//! - `prompt` - 规则式提示词增强

pub mod media;
pub mod orchestrator;
pub mod prompt;

pub use media::{MediaError, MediaProcessor};
pub use orchestrator::{CostEstimate, Orchestrator, PipelineError};
pub use prompt::{EnhancedPrompt, PromptEnhancer};
