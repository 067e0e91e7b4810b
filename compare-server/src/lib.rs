//! Models Compare - runs the same prompt against several hosted models
//! concurrently and compares their outputs.

pub mod api;
pub mod catalog;
pub mod compare;
pub mod config;
pub mod error;
pub mod inference;
pub mod output;
pub mod registry;
pub mod state;
pub mod test_util;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use catalog::{AssetGalleryClient, CatalogCache, CatalogSnapshot, CatalogSource, FetchError};
pub use compare::{BatchOrchestrator, ComparisonDispatcher, NoProgress, ProgressSink, TracingProgress};
pub use config::Config;
pub use error::{Error, Result};
pub use inference::{GitHubModelsClient, InferenceClient, InferenceError};
pub use registry::{ModelListing, ModelRegistry, SortField};
pub use state::AppState;

/// Wire the catalog, registry and inference client described by `config`.
pub fn build_state(config: Config) -> std::result::Result<AppState, reqwest::Error> {
    let source = Arc::new(AssetGalleryClient::new(
        &config.catalog.url,
        config.catalog.timeout(),
    )?);
    let cache = Arc::new(CatalogCache::new(source, config.catalog.ttl()));
    let registry = Arc::new(ModelRegistry::new(cache));

    let client = Arc::new(GitHubModelsClient::new(
        &config.inference.endpoint,
        config.inference.token.clone(),
    ));
    let dispatcher = Arc::new(
        ComparisonDispatcher::new(registry, client)
            .with_call_timeout(config.inference.request_timeout()),
    );

    Ok(AppState::new(config, dispatcher))
}

/// Build the HTTP application.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/v1", api::router())
        .route("/health", axum::routing::get(api::health::health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
