//! 错误类型模块
//!
//! 定义 Vidcast 应用中的各种错误类型。
//!
//! ## 设计原则
//! - 使用 thiserror 派生 Error trait
//! - 支持 From 转换以便错误传播
//! - 实现 Serialize 以支持 API 响应返回

use crate::registry::ProviderCategory;
use thiserror::Error;

/// Provider 注册表错误
///
/// 涵盖 Provider 注册与选择过程中可能出现的所有错误情况。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    /// 注册信息无效
    #[error("Provider 描述信息无效: {0}")]
    Validation(String),

    /// 没有满足约束的 Provider
    #[error("没有满足约束的可用 Provider (类别: {0})")]
    NoProviderAvailable(ProviderCategory),
}

impl From<RegistryError> for String {
    fn from(err: RegistryError) -> Self {
        err.to_string()
    }
}

impl serde::Serialize for RegistryError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// 任务跟踪错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum JobError {
    /// 任务不存在
    #[error("任务不存在: {0}")]
    NotFound(String),

    /// 任务尚未完成
    #[error("任务尚未完成: {0} (当前状态: {1})")]
    NotFinished(String, String),

    /// 任务已失败
    #[error("任务已失败: {0}")]
    Failed(String),
}

impl From<JobError> for String {
    fn from(err: JobError) -> Self {
        err.to_string()
    }
}

impl serde::Serialize for JobError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// 配置加载错误
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 配置文件读取失败
    #[error("配置文件读取失败: {0}")]
    Io(#[from] std::io::Error),

    /// 配置文件解析失败
    #[error("配置文件解析失败: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// 配置项无效
    #[error("配置项无效: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_error_display() {
        let err = RegistryError::NoProviderAvailable(ProviderCategory::Video);
        assert!(err.to_string().contains("video"));

        let err = RegistryError::Validation("quality_score 超出范围".to_string());
        assert!(err.to_string().contains("quality_score"));
    }

    #[test]
    fn test_job_error_to_string() {
        let err = JobError::NotFound("job-1".to_string());
        let s: String = err.into();
        assert!(s.contains("job-1"));
    }
}
