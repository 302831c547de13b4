//! Server mode
//!
//! Storage, services, CORS, request id and graceful shutdown.

use actix_cors::Cors;
use actix_web::{
    App, HttpServer,
    middleware::{Compress, DefaultHeaders},
    web,
};
use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::api::middleware::RequestIdMiddleware;
use crate::api::services::{AppStartTime, api_routes, health_routes};
use crate::config::{CorsConfig, get_config};
use crate::runtime::lifetime::{self, startup::StartupContext};

/// Validate CORS configuration at startup (runs once)
fn validate_cors_config(cors_config: &CorsConfig) {
    if cors_config.enabled && cors_config.allowed_origins.is_empty() {
        warn!(
            "CORS enabled but allowed_origins is empty. \
            No cross-origin requests will be allowed."
        );
    }
}

/// Build CORS middleware from configuration
fn build_cors_middleware(cors_config: &CorsConfig) -> Cors {
    // 未启用时保持浏览器默认的同源策略
    if !cors_config.enabled {
        return Cors::default();
    }

    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "PUT", "OPTIONS"])
        .allowed_headers(vec!["Content-Type", "Accept", "X-Request-ID"])
        .expose_headers(vec!["X-Request-ID", "Content-Disposition"])
        .max_age(cors_config.max_age);

    if cors_config.allowed_origins.iter().any(|o| o == "*") {
        cors = cors.allow_any_origin();
    } else {
        for origin in &cors_config.allowed_origins {
            cors = cors.allowed_origin(origin);
        }
    }
    cors
}

/// 注册共享数据与全部路由；服务器和集成测试共用
pub fn configure_app(
    cfg: &mut web::ServiceConfig,
    ctx: &StartupContext,
    app_start_time: &AppStartTime,
) {
    let registration_config = get_config().registration.clone();

    cfg.app_data(web::Data::new(ctx.storage.clone()))
        .app_data(web::Data::new(ctx.identity.clone()))
        .app_data(web::Data::new(ctx.registration.clone()))
        .app_data(web::Data::new(ctx.orders.clone()))
        .app_data(web::Data::new(ctx.payments.clone()))
        .app_data(web::Data::new(ctx.reconciliation.clone()))
        .app_data(web::Data::new(app_start_time.clone()))
        .service(health_routes(&ctx.route_config.health_prefix))
        .service(api_routes(
            &ctx.route_config.api_prefix,
            &registration_config,
        ));
}

/// Run the HTTP server until a shutdown signal arrives
pub async fn run_server() -> Result<()> {
    let config = get_config();
    let app_start_time = AppStartTime::default();

    let ctx = lifetime::startup::prepare_server_startup().await?;

    let cors_config = config.cors.clone();
    validate_cors_config(&cors_config);

    let cpu_count = config.server.cpu_count.max(1);
    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    let db_for_shutdown = ctx.storage.get_db().clone();

    info!(
        "API available at {}, health at {}",
        ctx.route_config.api_prefix, ctx.route_config.health_prefix
    );

    let server = HttpServer::new(move || {
        let cors = build_cors_middleware(&cors_config);
        let ctx = ctx.clone();
        let app_start_time = app_start_time.clone();

        App::new()
            .wrap(RequestIdMiddleware)
            .wrap(cors)
            .wrap(Compress::default())
            .wrap(
                DefaultHeaders::new().add(("Cache-Control", "no-cache, no-store, must-revalidate")),
            )
            .configure(move |cfg| configure_app(cfg, &ctx, &app_start_time))
    })
    .keep_alive(std::time::Duration::from_secs(30))
    .client_request_timeout(std::time::Duration::from_millis(5000))
    .client_disconnect_timeout(std::time::Duration::from_millis(1000))
    .workers(cpu_count)
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind {}", bind_address))?;

    warn!("Starting server at http://{}", bind_address);
    let server = server.run();

    // Wait for server or shutdown signal
    tokio::select! {
        res = server => {
            res.context("HTTP server terminated with error")?;
        }
        _ = lifetime::shutdown::listen_for_shutdown(&db_for_shutdown) => {
            warn!("Graceful shutdown completed");
        }
    }

    Ok(())
}
