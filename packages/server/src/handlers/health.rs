//! Liveness check: `GET /v1/health`.

use axum::{extract::State, Json};
use socialgraph_api::HealthResponse;

use super::AppState;

/// `GET /v1/health`
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        storage: state.storage.backend().into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}
