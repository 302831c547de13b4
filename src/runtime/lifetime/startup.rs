use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::services::{
    IdentityResolver, Notifier, OrderService, PaymentService, ReconciliationService,
    RegistrationService, notifier_from_config,
};
use crate::storage::{SeaOrmStorage, StorageFactory};
use crate::utils::links::LinkRenderer;

/// 服务器运行所需的全部服务实例
#[derive(Clone)]
pub struct StartupContext {
    pub storage: Arc<SeaOrmStorage>,
    pub identity: Arc<IdentityResolver>,
    pub registration: Arc<RegistrationService>,
    pub orders: Arc<OrderService>,
    pub payments: Arc<PaymentService>,
    pub reconciliation: Arc<ReconciliationService>,
    pub route_config: RouteConfig,
}

#[derive(Clone, Debug)]
pub struct RouteConfig {
    pub api_prefix: String,
    pub health_prefix: String,
}

impl StartupContext {
    /// 基于已有存储装配服务（测试也走这里）
    pub fn from_storage(storage: Arc<SeaOrmStorage>, notifier: Arc<dyn Notifier>) -> Self {
        let config = crate::config::get_config();
        let links = LinkRenderer::new(&config.links);

        Self {
            identity: Arc::new(IdentityResolver::new(storage.clone())),
            registration: Arc::new(RegistrationService::new(storage.clone(), links, notifier)),
            orders: Arc::new(OrderService::new(storage.clone())),
            payments: Arc::new(PaymentService::new(storage.clone())),
            reconciliation: Arc::new(ReconciliationService::new(storage.clone())),
            route_config: RouteConfig {
                api_prefix: config.server.api_prefix.clone(),
                health_prefix: config.server.health_prefix.clone(),
            },
            storage,
        }
    }
}

/// 准备服务器启动的上下文：存储（含迁移）、通知器、各业务服务
pub async fn prepare_server_startup() -> Result<StartupContext> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    let storage = StorageFactory::create()
        .await
        .context("Failed to create storage backend")?;
    info!(
        "Using storage backend: {}",
        storage.get_backend_config().storage_type
    );

    let notifier = notifier_from_config();
    info!("Welcome notifications via: {}", notifier.name());

    let context = StartupContext::from_storage(storage, notifier);

    info!(
        "Pre-startup processing completed in {:?}",
        start_time.elapsed()
    );
    Ok(context)
}
