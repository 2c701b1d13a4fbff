//! Health check endpoints.
//!
//! These endpoints are used by load balancers and monitoring systems
//! to verify service health.

use crate::state::AppState;
use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use ticket_history_core::{HealthReport, HealthStatus};

/// Service name reported by `/health`.
pub const SERVICE_NAME: &str = "ticket-history";

/// Liveness response body.
#[derive(Debug, Serialize)]
pub struct Liveness {
    /// Always `"ok"`
    pub status: &'static str,
    /// Service name
    pub service: &'static str,
    /// Crate version
    pub version: &'static str,
    /// Server time
    pub time: DateTime<Utc>,
}

/// Simple health check endpoint (for basic liveness).
///
/// This endpoint does NOT check dependencies (database, etc.).
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> Json<Liveness> {
    Json(Liveness {
        status: "ok",
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        time: Utc::now(),
    })
}

/// Readiness: runs every registered probe.
///
/// # Status Codes
///
/// - 200 OK: Healthy or Degraded
/// - 503 Service Unavailable: Unhealthy
///
/// # Endpoint
///
/// ```text
/// GET /ready
/// ```
pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let checks = join_all(state.probes().iter().map(|probe| probe.check())).await;
    let report = HealthReport::new(checks);

    let status = match report.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => {
            tracing::warn!(checks = ?report.checks, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        },
    };

    (status, Json(report))
}

/// Prometheus exposition.
///
/// ```text
/// GET /metrics
/// ```
#[allow(clippy::unused_async)]
pub async fn metrics(State(state): State<AppState>) -> Response {
    match state.metrics() {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}
