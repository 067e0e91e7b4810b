//! HTTP API.

pub mod compare;
pub mod health;
pub mod models;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Build the API router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(compare::router())
        .merge(models::router())
}
