//! Comparison endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use models_compare_common::{BatchRequest, BatchResult, ComparisonRequest, ComparisonResponse};
use serde::{Deserialize, Serialize};

use crate::compare::TracingProgress;
use crate::error::Result;
use crate::output::{resolve_output_path, save_json};
use crate::state::AppState;

/// Build the compare router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/compare", post(compare))
        .route("/compare/batch", post(batch_compare))
        .route("/compare/save", post(save_comparison))
}

/// POST /v1/compare - Run one prompt against several models.
async fn compare(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ComparisonRequest>,
) -> Result<Json<ComparisonResponse>> {
    let response = state.dispatcher.compare(&request, &TracingProgress).await?;
    Ok(Json(response))
}

/// POST /v1/compare/batch - Run several prompts against the same models.
async fn batch_compare(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BatchRequest>,
) -> Result<Json<BatchResult>> {
    let result = state
        .batch
        .run(&request.prompts, &request.template, &TracingProgress)
        .await?;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
struct SaveRequest {
    #[serde(flatten)]
    request: ComparisonRequest,
    #[serde(default)]
    output_path: Option<String>,
}

#[derive(Debug, Serialize)]
struct SaveResponse {
    path: String,
    message: String,
}

/// POST /v1/compare/save - Run a comparison and write it to a JSON file
/// under the configured output directory.
async fn save_comparison(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SaveRequest>,
) -> Result<Json<SaveResponse>> {
    let output = &state.config.output;
    let requested = body.output_path.as_deref().unwrap_or(&output.default_file);
    let path = resolve_output_path(&output.dir, requested)?;

    let response = state
        .dispatcher
        .compare(&body.request, &TracingProgress)
        .await?;
    save_json(&path, &response).await?;

    let path = path.display().to_string();
    Ok(Json(SaveResponse {
        message: format!("Results saved to {}", path),
        path,
    }))
}
