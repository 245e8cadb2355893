use crate::infra::AppState;
use axum::extract::Path;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use parcel_desk::error::AppError;
use parcel_desk::workflows::parcels::{PackageView, TrackingCode};
use serde::Serialize;
use serde_json::json;

#[derive(Debug, Serialize)]
pub(crate) struct PendingResponse {
    pub(crate) unit: String,
    pub(crate) count: usize,
    pub(crate) packages: Vec<PackageView>,
}

pub(crate) fn status_routes() -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/packages/:tracking_code", get(package_endpoint))
        .route("/api/v1/units/:unit/pending", get(pending_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };
    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn package_endpoint(
    Extension(state): Extension<AppState>,
    Path(raw_code): Path<String>,
) -> Result<Json<PackageView>, AppError> {
    let code =
        TrackingCode::parse(&raw_code).ok_or_else(|| AppError::PackageNotFound(raw_code.clone()))?;
    let ledger = state.ledger()?;
    let package = ledger
        .find_by_tracking_code(&code)
        .ok_or_else(|| AppError::PackageNotFound(code.to_string()))?;
    Ok(Json(package.view()))
}

pub(crate) async fn pending_endpoint(
    Extension(state): Extension<AppState>,
    Path(raw_unit): Path<String>,
) -> Result<Json<PendingResponse>, AppError> {
    let unit = state.roster.resolve(&raw_unit)?;
    let ledger = state.ledger()?;
    let packages: Vec<PackageView> = ledger
        .list_pending(&unit)
        .into_iter()
        .map(|package| package.view())
        .collect();

    Ok(Json(PendingResponse {
        unit: unit.to_string(),
        count: packages.len(),
        packages,
    }))
}
