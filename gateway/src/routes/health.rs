use axum::response::IntoResponse;
use axum::{Json, Router, routing::get};

use crate::HealthResponse;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

/// Liveness check — a static payload, deliberately independent of the
/// database and the oracles so probes cannot be starved by a slow backend.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Gateway is alive", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "gateway alive".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
