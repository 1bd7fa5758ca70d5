//! vidcast 服务入口
//!
//! 启动顺序：加载配置 → 准备存储目录 → 装配注册表 / 查找表 /
//! 编排器 → 启动终态任务清理 → 对外提供 HTTP / WebSocket 服务。

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use vidcast_core::config::AppConfig;
use vidcast_core::jobs::JobTracker;
use vidcast_core::registry::ProviderRegistry;
use vidcast_providers::ProviderDirectory;
use vidcast_server::{build_router, AppState};
use vidcast_services::Orchestrator;
use vidcast_websocket::ConnectionManager;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 配置路径：命令行参数优先，其次 VIDCAST_CONFIG 环境变量
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| std::env::var("VIDCAST_CONFIG").ok().map(PathBuf::from));
    let config = Arc::new(AppConfig::load(config_path.as_deref()).context("加载配置失败")?);
    config.ensure_storage_dirs().context("创建存储目录失败")?;

    let registry = Arc::new(ProviderRegistry::with_builtin_catalog());
    let directory = Arc::new(ProviderDirectory::from_config(&config));
    let tracker = Arc::new(JobTracker::new());
    let connections = Arc::new(ConnectionManager::new());
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&registry),
        directory,
        Arc::clone(&tracker),
        connections.clone(),
        Arc::clone(&config),
    ));

    // 终态任务定期清理
    {
        let tracker = Arc::clone(&tracker);
        let retention = config.retention;
        tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval(Duration::from_secs(retention.sweep_interval_secs));
            loop {
                ticker.tick().await;
                tracker.purge_expired(retention.job_retention_secs);
            }
        });
    }

    let state = AppState {
        orchestrator,
        registry,
        tracker,
        connections,
        config: Arc::clone(&config),
    };
    let router = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("监听 {addr} 失败"))?;
    info!(addr = %addr, version = vidcast_core::version(), "vidcast 服务已启动");
    axum::serve(listener, router).await?;
    Ok(())
}
