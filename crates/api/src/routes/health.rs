use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// `remote` or `local`.
    pub execution_mode: &'static str,
    /// Whether the record store is reachable; absent when none is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records_healthy: Option<bool>,
}

/// GET /health -- returns service and record store health.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let records_healthy = match &state.records {
        Some(records) => Some(match records.health_check().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Record store health check failed");
                false
            }
        }),
        None => None,
    };

    let status = if records_healthy == Some(false) {
        "degraded"
    } else {
        "ok"
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        execution_mode: state.config.execution_mode.name(),
        records_healthy,
    })
}

/// Mount health check routes (intended for root-level, NOT under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
