//! 核心类型和工具模块
//!
//! 包含 models, config, errors, registry, jobs 等基础功能

pub mod config;
pub mod errors;
pub mod jobs;
pub mod models;
pub mod registry;

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
