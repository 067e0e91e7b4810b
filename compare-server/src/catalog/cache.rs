//! TTL cache over a catalog source.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};

use super::{CatalogSnapshot, CatalogSource};

struct CachedSnapshot {
    snapshot: Arc<CatalogSnapshot>,
    expires_at: Instant,
}

impl CachedSnapshot {
    fn fresh(&self) -> Option<Arc<CatalogSnapshot>> {
        (Instant::now() < self.expires_at).then(|| Arc::clone(&self.snapshot))
    }
}

/// Serves the freshest known catalog snapshot.
///
/// A new cache holds nothing; the first `get` populates it. A snapshot is
/// served unchanged until it is `ttl` old, then the next `get` refetches.
/// If the fetch fails the built-in fallback is cached for the same window,
/// so an unreachable catalog is retried at most once per TTL.
///
/// Readers take the snapshot lock only briefly. Refreshes are serialized by
/// `refresh_gate`: a caller that queued behind an in-flight fetch re-checks
/// freshness once it gets the gate and returns the snapshot that fetch
/// stored instead of fetching again.
pub struct CatalogCache {
    source: Arc<dyn CatalogSource>,
    ttl: Duration,
    current: RwLock<Option<CachedSnapshot>>,
    refresh_gate: Mutex<()>,
}

impl CatalogCache {
    pub fn new(source: Arc<dyn CatalogSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            current: RwLock::new(None),
            refresh_gate: Mutex::new(()),
        }
    }

    /// Current snapshot, refreshing it first if it is missing or expired.
    pub async fn get(&self) -> Arc<CatalogSnapshot> {
        if let Some(snapshot) = self.fresh().await {
            return snapshot;
        }

        let _gate = self.refresh_gate.lock().await;
        if let Some(snapshot) = self.fresh().await {
            return snapshot;
        }

        let snapshot = match self.source.fetch().await {
            Ok(models) => {
                tracing::info!("Fetched {} models from catalog", models.len());
                CatalogSnapshot::live(models)
            }
            Err(e) => {
                tracing::warn!("Failed to fetch models from catalog, using fallback list: {}", e);
                CatalogSnapshot::fallback()
            }
        };

        let snapshot = Arc::new(snapshot);
        *self.current.write().await = Some(CachedSnapshot {
            snapshot: Arc::clone(&snapshot),
            expires_at: Instant::now() + self.ttl,
        });
        snapshot
    }

    /// Mark the held snapshot stale so the next `get` refetches.
    pub async fn invalidate(&self) {
        if let Some(cached) = self.current.write().await.as_mut() {
            cached.expires_at = Instant::now();
        }
    }

    /// When the held snapshot was captured, if there is one.
    pub async fn cached_at(&self) -> Option<DateTime<Utc>> {
        self.current
            .read()
            .await
            .as_ref()
            .map(|c| c.snapshot.captured_at)
    }

    async fn fresh(&self) -> Option<Arc<CatalogSnapshot>> {
        self.current.read().await.as_ref().and_then(CachedSnapshot::fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FALLBACK_MODEL_IDS;
    use crate::test_util::{descriptor, ScriptedCatalogSource};
    use models_compare_common::SnapshotSource;

    const TTL: Duration = Duration::from_secs(600);

    fn live_models() -> Vec<models_compare_common::ModelDescriptor> {
        vec![
            descriptor("gpt-4o", "GPT-4o", "OpenAI"),
            descriptor("Phi-4", "Phi-4", "Microsoft"),
        ]
    }

    #[tokio::test]
    async fn test_within_ttl_returns_same_snapshot() {
        let source = Arc::new(ScriptedCatalogSource::ok(live_models()));
        let cache = CatalogCache::new(source.clone(), TTL);

        let first = cache.get().await;
        let second = cache.get().await;
        let third = cache.get().await;

        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&second, &third));
        assert_eq!(source.fetch_count(), 1);
        assert_eq!(first.source, SnapshotSource::Live);
        assert_eq!(first.ids(), vec!["gpt-4o", "Phi-4"]);
    }

    #[tokio::test]
    async fn test_new_cache_is_empty() {
        let source = Arc::new(ScriptedCatalogSource::ok(live_models()));
        let cache = CatalogCache::new(source.clone(), TTL);
        assert!(cache.cached_at().await.is_none());
        assert_eq!(source.fetch_count(), 0);

        cache.get().await;
        assert!(cache.cached_at().await.is_some());
    }

    #[tokio::test]
    async fn test_expired_snapshot_is_refetched() {
        let source = Arc::new(ScriptedCatalogSource::ok(live_models()));
        let cache = CatalogCache::new(source.clone(), Duration::from_millis(20));

        let first = cache.get().await;
        tokio::time::sleep(Duration::from_millis(40)).await;
        let second = cache.get().await;

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(source.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_fetch_serves_fallback() {
        let source = Arc::new(ScriptedCatalogSource::failing());
        let cache = CatalogCache::new(source.clone(), TTL);

        let snapshot = cache.get().await;
        assert_eq!(snapshot.source, SnapshotSource::Fallback);
        assert_eq!(snapshot.models.len(), 8);
        assert_eq!(snapshot.ids(), FALLBACK_MODEL_IDS);
    }

    #[tokio::test]
    async fn test_fallback_is_cached_for_ttl() {
        let source = Arc::new(ScriptedCatalogSource::failing());
        let cache = CatalogCache::new(source.clone(), TTL);

        let first = cache.get().await;
        let second = cache.get().await;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let source = Arc::new(ScriptedCatalogSource::ok(live_models()));
        let cache = CatalogCache::new(source.clone(), TTL);

        cache.get().await;
        cache.invalidate().await;
        cache.get().await;
        assert_eq!(source.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_callers_after_expiry_fetch_once() {
        let source = Arc::new(
            ScriptedCatalogSource::ok(live_models()).with_delay(Duration::from_millis(50)),
        );
        let cache = Arc::new(CatalogCache::new(source.clone(), TTL));

        cache.get().await;
        cache.invalidate().await;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { cache.get().await })
            })
            .collect();

        let mut snapshots = Vec::new();
        for handle in handles {
            snapshots.push(handle.await.unwrap());
        }

        assert_eq!(source.fetch_count(), 2);
        assert!(snapshots.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[tokio::test]
    async fn test_concurrent_callers_on_failing_source_fetch_once() {
        let source = Arc::new(
            ScriptedCatalogSource::failing().with_delay(Duration::from_millis(50)),
        );
        let cache = Arc::new(CatalogCache::new(source.clone(), TTL));

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { cache.get().await })
            })
            .collect();

        for handle in handles {
            let snapshot = handle.await.unwrap();
            assert_eq!(snapshot.ids(), FALLBACK_MODEL_IDS);
        }
        assert_eq!(source.fetch_count(), 1);
    }
}
