//! Health check endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health - Liveness plus the age of the cached catalog.
///
/// Never triggers a catalog fetch; `catalog_cached_at` is null until the
/// first request that needs the catalog.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    let cached_at = state.registry.cached_at().await;
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "catalog_cached_at": cached_at })),
    )
}
