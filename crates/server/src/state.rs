//! 共享应用状态

use std::sync::Arc;

use vidcast_core::config::AppConfig;
use vidcast_core::jobs::JobTracker;
use vidcast_core::registry::ProviderRegistry;
use vidcast_services::Orchestrator;
use vidcast_websocket::ConnectionManager;

/// 所有路由共享的应用状态
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub registry: Arc<ProviderRegistry>,
    pub tracker: Arc<JobTracker>,
    pub connections: Arc<ConnectionManager>,
    pub config: Arc<AppConfig>,
}
