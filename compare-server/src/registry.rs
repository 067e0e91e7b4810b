//! Read-only model registry over the catalog cache.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use models_compare_common::{ModelDescriptor, SnapshotSource};
use serde::Serialize;

use crate::catalog::{CatalogCache, CatalogSnapshot};
use crate::error::{Error, Result};

/// Fields the model list can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    DisplayName,
    Publisher,
    Popularity,
    ContextWindow,
    Id,
}

impl SortField {
    /// Parse a sort key. Unknown keys sort by display name.
    pub fn parse(key: &str) -> Self {
        match key {
            "displayName" => SortField::DisplayName,
            "publisher" => SortField::Publisher,
            "popularity" => SortField::Popularity,
            "contextWindow" | "context_window" => SortField::ContextWindow,
            "id" => SortField::Id,
            _ => SortField::DisplayName,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::DisplayName => "displayName",
            SortField::Publisher => "publisher",
            SortField::Popularity => "popularity",
            SortField::ContextWindow => "contextWindow",
            SortField::Id => "id",
        }
    }

    fn compare(&self, a: &ModelDescriptor, b: &ModelDescriptor) -> Ordering {
        match self {
            SortField::DisplayName => a.display_name.cmp(&b.display_name),
            SortField::Publisher => a.publisher.cmp(&b.publisher),
            SortField::Popularity => a.popularity.total_cmp(&b.popularity),
            SortField::ContextWindow => a.context_window.cmp(&b.context_window),
            SortField::Id => a.id.cmp(&b.id),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AppliedFilters {
    pub publisher: Option<String>,
    pub sort_by: &'static str,
}

/// Model list with the metadata callers ask for alongside it.
#[derive(Debug, Clone, Serialize)]
pub struct ModelListing {
    pub models: Vec<ModelDescriptor>,
    pub count: usize,
    pub timestamp: DateTime<Utc>,
    pub source: SnapshotSource,
    /// Distinct publishers among the listed models, sorted.
    pub publishers: Vec<String>,
    pub applied_filters: AppliedFilters,
}

/// Filtered, sorted views of the current catalog snapshot.
pub struct ModelRegistry {
    cache: Arc<CatalogCache>,
}

impl ModelRegistry {
    pub fn new(cache: Arc<CatalogCache>) -> Self {
        Self { cache }
    }

    /// Model ids, optionally restricted to one publisher (case-insensitive),
    /// sorted by `sort_by`. Ties keep catalog order.
    pub async fn list_ids(&self, filter_publisher: Option<&str>, sort_by: &str) -> Vec<String> {
        self.select(filter_publisher, SortField::parse(sort_by))
            .await
            .into_iter()
            .map(|m| m.id)
            .collect()
    }

    /// Same selection as [`list_ids`](Self::list_ids), with full descriptors
    /// and listing metadata.
    pub async fn list(&self, filter_publisher: Option<&str>, sort_by: &str) -> ModelListing {
        let snapshot = self.cache.get().await;
        let sort = SortField::parse(sort_by);
        let models = select(&snapshot.models, filter_publisher, sort);

        let mut publishers: Vec<String> = models.iter().map(|m| m.publisher.clone()).collect();
        publishers.sort();
        publishers.dedup();

        ModelListing {
            count: models.len(),
            models,
            timestamp: snapshot.captured_at,
            source: snapshot.source,
            publishers,
            applied_filters: AppliedFilters {
                publisher: normalize_filter(filter_publisher).map(str::to_string),
                sort_by: sort.as_str(),
            },
        }
    }

    /// Exact-id lookup.
    pub async fn describe(&self, model_id: &str) -> Result<ModelDescriptor> {
        self.cache
            .get()
            .await
            .get(model_id)
            .cloned()
            .ok_or_else(|| Error::ModelNotFound(model_id.to_string()))
    }

    /// All ids in catalog order.
    pub async fn ids(&self) -> Vec<String> {
        self.cache.get().await.ids()
    }

    pub async fn snapshot(&self) -> Arc<CatalogSnapshot> {
        self.cache.get().await
    }

    /// Drop the cached snapshot and fetch a new one now.
    pub async fn refresh(&self) -> Arc<CatalogSnapshot> {
        self.cache.invalidate().await;
        self.cache.get().await
    }

    /// Capture time of the cached snapshot, without triggering a fetch.
    pub async fn cached_at(&self) -> Option<DateTime<Utc>> {
        self.cache.cached_at().await
    }

    /// Markdown overview grouped by publisher.
    pub async fn render_markdown(&self) -> String {
        let snapshot = self.cache.get().await;
        render_markdown(&snapshot.models)
    }

    async fn select(&self, filter_publisher: Option<&str>, sort: SortField) -> Vec<ModelDescriptor> {
        let snapshot = self.cache.get().await;
        select(&snapshot.models, filter_publisher, sort)
    }
}

fn normalize_filter(filter: Option<&str>) -> Option<&str> {
    filter.map(str::trim).filter(|p| !p.is_empty())
}

fn select(
    models: &[ModelDescriptor],
    filter_publisher: Option<&str>,
    sort: SortField,
) -> Vec<ModelDescriptor> {
    let filter = normalize_filter(filter_publisher).map(str::to_lowercase);
    let mut selected: Vec<ModelDescriptor> = models
        .iter()
        .filter(|m| match &filter {
            Some(publisher) => m.publisher.to_lowercase() == *publisher,
            None => true,
        })
        .cloned()
        .collect();
    // sort_by is stable, so equal keys keep catalog order
    selected.sort_by(|a, b| sort.compare(a, b));
    selected
}

fn render_markdown(models: &[ModelDescriptor]) -> String {
    let mut by_publisher: BTreeMap<&str, Vec<&ModelDescriptor>> = BTreeMap::new();
    for model in models {
        by_publisher.entry(model.publisher.as_str()).or_default().push(model);
    }

    let mut out = String::from("# Available Models\n\n");
    for (publisher, mut group) in by_publisher {
        group.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        let _ = writeln!(out, "## {}\n", publisher);
        for model in group {
            let _ = write!(out, "- **{}** (`{}`)", model.display_name, model.id);
            if model.context_window > 0 {
                let _ = write!(out, " - {} tokens", group_thousands(model.context_window));
            }
            if !model.summary.is_empty() {
                let _ = write!(out, " - {}", model.summary);
            }
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

/// 131072 -> "131,072"
fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
