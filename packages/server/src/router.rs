//! Assembles the Axum [`Router`] from all handler modules.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::StatusCode,
    routing::{delete, get, post},
    Router,
};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::{
    config::ServerConfig,
    handlers::{follows, health, users, AppState},
    storage::Storage,
};

/// Build the complete application router with shared state.
pub fn build_router(storage: Arc<dyn Storage>, config: ServerConfig) -> Router {
    let timeout = Duration::from_secs(config.request_timeout_secs);
    let state = AppState { storage, config };

    Router::new()
        .route("/v1/health", get(health::health))
        // Users
        .route("/v1/users", post(users::register))
        .route(
            "/v1/users/{id}",
            get(users::get_user).patch(users::update_user),
        )
        // Follows
        .route(
            "/v1/users/{id}/following",
            post(follows::follow).get(follows::list_following),
        )
        .route(
            "/v1/users/{id}/following/{followee_id}",
            delete(follows::unfollow),
        )
        .route("/v1/users/{id}/followers", get(follows::list_followers))
        .route("/v1/users/{id}/mutual", get(follows::list_mutual))
        .with_state(state)
        .layer(timeout_layer(timeout))
        .layer(TraceLayer::new_for_http())
}

/// Requests running longer than `timeout` are answered with 408.
fn timeout_layer(timeout: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout)
}
