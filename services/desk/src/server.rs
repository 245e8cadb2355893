use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::status_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use parcel_desk::config::AppConfig;
use parcel_desk::error::AppError;
use parcel_desk::workflows::parcels::BuildingRoster;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// Runs the read-only status service until the process is stopped.
pub(crate) fn run(mut config: AppConfig, mut args: ServeArgs) -> Result<(), AppError> {
    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(serve(config))
}

async fn serve(config: AppConfig) -> Result<(), AppError> {
    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        storage: config.storage.clone(),
        roster: BuildingRoster::standard(),
    };

    let app = status_routes()
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        packages = %config.storage.packages_path.display(),
        "parcel desk status service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
