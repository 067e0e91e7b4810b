//! Model catalog: remote source, TTL cache and built-in fallback.
//!
//! The `CatalogSource` trait hides where the model list comes from. The
//! `CatalogCache` wraps a source and never fails: when the source does, it
//! serves the built-in fallback list instead.

mod cache;
mod fallback;
mod gallery;

pub use cache::CatalogCache;
pub use fallback::{fallback_models, FALLBACK_MODEL_IDS};
pub use gallery::AssetGalleryClient;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use models_compare_common::{ModelDescriptor, SnapshotSource};

/// Why a catalog fetch failed. Always recovered by the cache.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("catalog request failed: {0}")]
    Request(String),

    #[error("catalog returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed catalog payload: {0}")]
    Decode(String),

    #[error("catalog returned no models")]
    Empty,
}

/// Where the model list comes from.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch the full model list, in catalog order.
    async fn fetch(&self) -> Result<Vec<ModelDescriptor>, FetchError>;
}

/// A timestamped, immutable model list.
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    pub models: Vec<ModelDescriptor>,
    pub captured_at: DateTime<Utc>,
    pub source: SnapshotSource,
}

impl CatalogSnapshot {
    pub fn live(models: Vec<ModelDescriptor>) -> Self {
        Self {
            models,
            captured_at: Utc::now(),
            source: SnapshotSource::Live,
        }
    }

    pub fn fallback() -> Self {
        Self {
            models: fallback_models(),
            captured_at: Utc::now(),
            source: SnapshotSource::Fallback,
        }
    }

    /// Model ids in catalog order.
    pub fn ids(&self) -> Vec<String> {
        self.models.iter().map(|m| m.id.clone()).collect()
    }

    pub fn contains(&self, model_id: &str) -> bool {
        self.models.iter().any(|m| m.id == model_id)
    }

    pub fn get(&self, model_id: &str) -> Option<&ModelDescriptor> {
        self.models.iter().find(|m| m.id == model_id)
    }
}
