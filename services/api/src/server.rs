use crate::cli::ServeArgs;
use crate::infra::{intake_service, AppState};
use crate::routes::with_safety_work_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};
use work_permit::config::AppConfig;
use work_permit::db;
use work_permit::error::AppError;
use work_permit::telemetry;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let pool = db::prepare(&config.database).await?;
    let service = Arc::new(intake_service(&config, pool.clone())?);

    let app = with_safety_work_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "safety work intake ready");

    let shutdown_flag = readiness_flag.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(%err, "unable to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            shutdown_flag.store(false, Ordering::Release);
            info!("shutdown requested; draining connections");
        })
        .await?;

    pool.close().await;
    info!("safety work intake stopped");
    Ok(())
}

/// Apply embedded migrations to the configured database and exit.
pub(crate) async fn migrate() -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let pool = db::connection_pool(&config.database).await?;
    db::run_pending_migrations(&pool).await?;
    pool.close().await;

    info!(url = %config.database.url, "database migrations applied");
    Ok(())
}
