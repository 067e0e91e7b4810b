//! Model catalog types.

use serde::{Deserialize, Serialize};

/// A hosted model as listed by the catalog.
///
/// Descriptors are built once per catalog snapshot and never modified
/// afterwards; every field has a default so sparse catalog records still
/// produce a usable descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDescriptor {
    /// Model identifier, unique within a snapshot (e.g., "gpt-4o").
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub publisher: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub version: String,
    /// Input context window in tokens. 0 when the catalog does not say.
    #[serde(default)]
    pub context_window: u64,
    #[serde(default)]
    pub supported_languages: Vec<String>,
    #[serde(default)]
    pub popularity: f64,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub asset_id: String,
}

impl ModelDescriptor {
    pub fn new(id: &str, display_name: &str, publisher: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            publisher: publisher.to_string(),
            summary: String::new(),
            version: String::new(),
            context_window: 0,
            supported_languages: Vec::new(),
            popularity: 0.0,
            keywords: Vec::new(),
            asset_id: String::new(),
        }
    }

    pub fn with_summary(mut self, summary: &str) -> Self {
        self.summary = summary.to_string();
        self
    }

    pub fn with_context_window(mut self, tokens: u64) -> Self {
        self.context_window = tokens;
        self
    }

    pub fn with_popularity(mut self, popularity: f64) -> Self {
        self.popularity = popularity;
        self
    }
}

/// Where a catalog snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotSource {
    /// Fetched from the remote catalog.
    Live,
    /// Built-in list used when the remote catalog could not be fetched.
    Fallback,
}

impl std::fmt::Display for SnapshotSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotSource::Live => write!(f, "live"),
            SnapshotSource::Fallback => write!(f, "fallback"),
        }
    }
}
