//! 远程调用错误类型
//!
//! 任何非成功响应、超时或传输错误都视为一次 Provider 调用失败，
//! 由编排器统一转化为降级尝试，不区分瞬时与永久失败。

use thiserror::Error;

/// Provider 调用错误
#[derive(Error, Debug, Clone)]
pub enum ProviderCallError {
    /// 请求发送失败（网络 / TLS 等传输层错误）
    #[error("请求发送失败: {0}")]
    Request(String),

    /// 远程返回非成功状态码
    #[error("远程返回错误状态 ({status}): {payload}")]
    Status { status: u16, payload: String },

    /// 响应缺少必需字段或解析失败
    #[error("响应解析失败: {0}")]
    Payload(String),

    /// 调用超时
    #[error("调用超时 ({0} 秒)")]
    Timeout(u64),

    /// 远程任务以失败终结
    #[error("远程任务失败: {0}")]
    TaskFailed(String),

    /// Provider 未配置或不可用
    #[error("Provider 不可用: {0}")]
    Unavailable(String),
}

pub type ProviderCallResult<T> = Result<T, ProviderCallError>;

impl From<reqwest::Error> for ProviderCallError {
    fn from(err: reqwest::Error) -> Self {
        ProviderCallError::Request(err.to_string())
    }
}
