//! Shared application state.

use std::sync::Arc;

use crate::compare::{BatchOrchestrator, ComparisonDispatcher};
use crate::config::Config;
use crate::registry::ModelRegistry;

/// Shared application state passed to all handlers.
pub struct AppState {
    pub config: Config,
    pub registry: Arc<ModelRegistry>,
    pub dispatcher: Arc<ComparisonDispatcher>,
    pub batch: BatchOrchestrator,
}

impl AppState {
    pub fn new(config: Config, dispatcher: Arc<ComparisonDispatcher>) -> Self {
        Self {
            config,
            registry: Arc::clone(dispatcher.registry()),
            batch: BatchOrchestrator::new(Arc::clone(&dispatcher)),
            dispatcher,
        }
    }
}
