//! HTTP request handlers for all socialgraph endpoints.
//!
//! Handlers are async functions that receive Axum extractors and return
//! `Result<impl IntoResponse, AppError>`. Authorization (who may act on
//! whose edges) lives here; storage enforces only the data invariants.

pub mod follows;
pub mod health;
pub mod users;

use std::sync::Arc;

use socialgraph::{validate_page, PageParams, UserId};
use socialgraph_api::UserProfile;

use crate::{config::ServerConfig, error::AppError, storage::Storage};

/// Shared application state threaded through all Axum handlers via [`axum::extract::State`].
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub config: ServerConfig,
}

impl AppState {
    /// Fetch a profile or fail with 404.
    pub(crate) async fn require_user(&self, id: UserId) -> Result<UserProfile, AppError> {
        self.storage
            .get_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {id} not found")))
    }
}

/// Raw `?page=&limit=` query; absent fields take the configured defaults.
#[derive(Debug, Default, serde::Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PageQuery {
    pub(crate) fn resolve(&self, config: &ServerConfig) -> Result<PageParams, AppError> {
        let params = PageParams::new(
            self.page.unwrap_or(1),
            self.limit.unwrap_or(config.default_page_limit),
        );
        Ok(validate_page(params, config.max_page_limit)?)
    }
}
