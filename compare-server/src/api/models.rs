//! Model catalog endpoints.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::Error;
use crate::registry::ModelListing;
use crate::state::AppState;

/// Build the models router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/models", get(list_models))
        .route("/models/markdown", get(models_markdown))
        .route("/models/refresh", post(refresh_models))
        .route("/models/:id", get(get_model))
}

#[derive(Debug, Deserialize)]
struct ListModelsQuery {
    #[serde(default)]
    filter_publisher: Option<String>,
    #[serde(default = "default_sort_by")]
    sort_by: String,
    #[serde(default)]
    include_metadata: bool,
}

fn default_sort_by() -> String {
    "displayName".to_string()
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ListModelsResponse {
    Ids { model_ids: Vec<String>, count: usize },
    Detailed(ModelListing),
}

/// GET /v1/models - List model ids, or full descriptors with `include_metadata`.
async fn list_models(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListModelsQuery>,
) -> Json<ListModelsResponse> {
    let filter = query.filter_publisher.as_deref();

    let response = if query.include_metadata {
        ListModelsResponse::Detailed(state.registry.list(filter, &query.sort_by).await)
    } else {
        let model_ids = state.registry.list_ids(filter, &query.sort_by).await;
        ListModelsResponse::Ids {
            count: model_ids.len(),
            model_ids,
        }
    };

    Json(response)
}

/// GET /v1/models/markdown - Human-readable catalog grouped by publisher.
async fn models_markdown(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
        state.registry.render_markdown().await,
    )
}

/// POST /v1/models/refresh - Refetch the catalog now instead of waiting for the TTL.
async fn refresh_models(State(state): State<Arc<AppState>>) -> Json<Value> {
    let snapshot = state.registry.refresh().await;
    tracing::info!(
        "Catalog refreshed on request: {} models ({})",
        snapshot.models.len(),
        snapshot.source
    );
    Json(json!({
        "count": snapshot.models.len(),
        "source": snapshot.source,
        "timestamp": snapshot.captured_at,
    }))
}

/// GET /v1/models/:id - Details for one model.
async fn get_model(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match state.registry.describe(&id).await {
        Ok(model) => Json(json!({ "model": model, "found": true })).into_response(),
        Err(e @ Error::ModelNotFound(_)) => {
            let body = json!({
                "error": e.to_string(),
                "found": false,
                "available_models": state.registry.ids().await,
            });
            (StatusCode::NOT_FOUND, Json(body)).into_response()
        }
        Err(e) => e.into_response(),
    }
}
