//! 配置模块
//!
//! 应用配置从 YAML 文件加载，部分字段支持环境变量覆盖。
//! Provider 的 API Key 支持直接配置或引用环境变量。

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,
    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,
    /// 允许的 CORS 来源
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:5173".to_string(),
        "http://localhost:3000".to_string(),
    ]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
        }
    }
}

/// 远程调用超时配置（秒）
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// 视频生成超时
    #[serde(default = "default_video_timeout")]
    pub video_secs: u64,
    /// 语音合成 / 克隆超时
    #[serde(default = "default_voice_timeout")]
    pub voice_secs: u64,
    /// 语言检测超时
    #[serde(default = "default_language_timeout")]
    pub language_secs: u64,
    /// 音视频合成超时
    #[serde(default = "default_merge_timeout")]
    pub merge_secs: u64,
}

fn default_video_timeout() -> u64 {
    600
}

fn default_voice_timeout() -> u64 {
    120
}

fn default_language_timeout() -> u64 {
    30
}

fn default_merge_timeout() -> u64 {
    120
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            video_secs: default_video_timeout(),
            voice_secs: default_voice_timeout(),
            language_secs: default_language_timeout(),
            merge_secs: default_merge_timeout(),
        }
    }
}

/// 单个 Provider 的接入配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderEndpoint {
    /// API 地址（留空使用适配器默认值）
    #[serde(default)]
    pub api_host: String,
    /// API Key（明文，优先级高于 api_key_env）
    #[serde(default)]
    pub api_key: Option<String>,
    /// 存放 API Key 的环境变量名
    #[serde(default)]
    pub api_key_env: Option<String>,
}

impl ProviderEndpoint {
    /// 解析 API Key：先取明文配置，再回退到环境变量
    pub fn resolve_key(&self) -> Option<String> {
        if let Some(key) = &self.api_key {
            if !key.trim().is_empty() {
                return Some(key.clone());
            }
        }
        self.api_key_env
            .as_ref()
            .and_then(|name| std::env::var(name).ok())
            .filter(|v| !v.trim().is_empty())
    }
}

/// 任务保留配置
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// 终态任务保留时长（秒）
    #[serde(default = "default_retention")]
    pub job_retention_secs: i64,
    /// 清理间隔（秒）
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_retention() -> i64 {
    3600
}

fn default_sweep_interval() -> u64 {
    300
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            job_retention_secs: default_retention(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,
    /// 本地存储目录（默认 ~/.vidcast/storage）
    #[serde(default)]
    pub storage_path: Option<PathBuf>,
    /// 各 Provider 接入配置（键为 Provider ID）
    #[serde(default)]
    pub providers: HashMap<String, ProviderEndpoint>,
    /// 远程调用超时
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    /// 任务保留
    #[serde(default)]
    pub retention: RetentionConfig,
}

impl AppConfig {
    /// 从 YAML 文件加载；`path` 为 None 或文件不存在时使用默认配置
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) if path.exists() => {
                let content = std::fs::read_to_string(path)?;
                serde_yaml::from_str(&content)?
            }
            _ => Self::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 应用环境变量覆盖
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("VIDCAST_HOST") {
            if !host.trim().is_empty() {
                self.server.host = host;
            }
        }
        if let Ok(port) = std::env::var("VIDCAST_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Ok(storage) = std::env::var("VIDCAST_STORAGE_PATH") {
            if !storage.trim().is_empty() {
                self.storage_path = Some(PathBuf::from(storage));
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.retention.job_retention_secs < 0 {
            return Err(ConfigError::Invalid(
                "retention.job_retention_secs 不能为负".to_string(),
            ));
        }
        Ok(())
    }

    /// 本地存储目录
    pub fn storage_path(&self) -> PathBuf {
        self.storage_path.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".vidcast")
                .join("storage")
        })
    }

    /// 产物输出目录
    pub fn outputs_dir(&self) -> PathBuf {
        self.storage_path().join("outputs")
    }

    /// 临时文件目录
    pub fn temp_dir(&self) -> PathBuf {
        self.storage_path().join("temp")
    }

    /// 查询 Provider 接入配置
    pub fn provider_endpoint(&self, id: &str) -> ProviderEndpoint {
        self.providers.get(id).cloned().unwrap_or_default()
    }

    /// 创建存储目录结构
    pub fn ensure_storage_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.outputs_dir())?;
        std::fs::create_dir_all(self.temp_dir())?;
        std::fs::create_dir_all(self.storage_path().join("uploads"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.timeouts.video_secs, 600);
        assert_eq!(config.retention.job_retention_secs, 3600);
        assert!(config.storage_path().ends_with("storage"));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = AppConfig::load(Some(Path::new("/nonexistent/vidcast.yaml"))).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_load_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
server:
  port: 9000
providers:
  fish_audio:
    api_key: test-key
  veo_3.1:
    api_key_env: VIDCAST_TEST_VEO_KEY
timeouts:
  video_secs: 240
"#
        )
        .unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.timeouts.video_secs, 240);
        // 语音超时未配置，回落默认值
        assert_eq!(config.timeouts.voice_secs, 120);
        assert_eq!(
            config.provider_endpoint("fish_audio").resolve_key().as_deref(),
            Some("test-key")
        );
        // 未配置的 Provider 返回空接入配置
        assert!(config.provider_endpoint("unknown").resolve_key().is_none());
    }

    #[test]
    fn test_resolve_key_env_fallback() {
        std::env::set_var("VIDCAST_TEST_KEY_ENV", "from-env");
        let endpoint = ProviderEndpoint {
            api_host: String::new(),
            api_key: None,
            api_key_env: Some("VIDCAST_TEST_KEY_ENV".to_string()),
        };
        assert_eq!(endpoint.resolve_key().as_deref(), Some("from-env"));
        std::env::remove_var("VIDCAST_TEST_KEY_ENV");
    }
}
