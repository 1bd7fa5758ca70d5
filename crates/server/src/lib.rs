//! HTTP API 服务器
//!
//! 对外暴露生成、Provider 查询、语言检测、语音与进度推送接口。
//!
//! ## 路由结构
//!
//! - `POST /api/generation/create` - 提交生成任务
//! - `GET  /api/generation/status/:job_id` - 查询任务进度
//! - `GET  /api/generation/result/:job_id` - 获取最终结果
//! - `DELETE /api/generation/jobs/:job_id` - 取消任务
//! - `GET  /api/generation/estimate` - 成本估算
//! - `GET  /api/providers` - Provider 列表
//! - `GET  /api/providers/recommendations` - 用例推荐
//! - `GET  /api/providers/stats` - 使用统计
//! - `POST /api/prompt/enhance` - 提示词增强
//! - `POST /api/language/detect` - 语言检测
//! - `POST /api/voice/clone` - 声音克隆
//! - `POST /api/voice/tts` - 语音合成
//! - `GET  /ws/progress/:job_id` - 进度推送（WebSocket）
//! - `GET  /health` - 健康检查
//! - `GET  /static/*` - 产物静态服务

mod error;
mod routes;
mod state;

pub use error::ApiError;
pub use routes::build_router;
pub use state::AppState;

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
