//! In-memory query cache using moka

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use moka::future::Cache as MokaCache;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::domain::{CacheAdapter, DomainError, QueryKey, QueryKeyPattern};

/// Loads the current value of a query from its source
pub type QueryFetcher =
    Arc<dyn Fn(QueryKey) -> BoxFuture<'static, Result<Value, DomainError>> + Send + Sync>;

/// Configuration for the in-memory query cache
#[derive(Debug, Clone, Deserialize)]
pub struct InMemoryQueryCacheConfig {
    /// Maximum number of cached query results
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
    /// Entries older than this are evicted regardless of staleness
    #[serde(default)]
    pub time_to_live_secs: Option<u64>,
}

fn default_max_capacity() -> u64 {
    10_000
}

impl Default for InMemoryQueryCacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: default_max_capacity(),
            time_to_live_secs: None,
        }
    }
}

impl InMemoryQueryCacheConfig {
    pub fn with_max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = capacity;
        self
    }

    pub fn with_time_to_live(mut self, ttl: Duration) -> Self {
        self.time_to_live_secs = Some(ttl.as_secs());
        self
    }
}

/// A cached query result
#[derive(Debug, Clone, PartialEq)]
pub struct CachedQuery {
    pub value: Value,
    /// Set by `invalidate`; cleared when the value is fetched again
    pub stale: bool,
    pub updated_at: DateTime<Utc>,
}

impl CachedQuery {
    fn fresh(value: Value) -> Self {
        Self {
            value,
            stale: false,
            updated_at: Utc::now(),
        }
    }
}

/// Query result cache implementing the `CacheAdapter` contract
///
/// Features:
/// - Family and exact pattern invalidation via `QueryKeyPattern::matches`
/// - Refetch through per-procedure fetchers
/// - Capacity and TTL eviction handled by moka
pub struct InMemoryQueryCache {
    entries: MokaCache<QueryKey, CachedQuery>,
    fetchers: RwLock<HashMap<String, QueryFetcher>>,
    config: InMemoryQueryCacheConfig,
}

impl fmt::Debug for InMemoryQueryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryQueryCache")
            .field("config", &self.config)
            .field("entries", &self.entries.entry_count())
            .finish()
    }
}

impl Default for InMemoryQueryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryQueryCache {
    pub fn new() -> Self {
        Self::with_config(InMemoryQueryCacheConfig::default())
    }

    pub fn with_config(config: InMemoryQueryCacheConfig) -> Self {
        let mut builder = MokaCache::builder().max_capacity(config.max_capacity);

        if let Some(secs) = config.time_to_live_secs {
            builder = builder.time_to_live(Duration::from_secs(secs));
        }

        Self {
            entries: builder.build(),
            fetchers: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Registers the fetcher used to refresh every key under `procedure`
    pub fn register_fetcher<F>(&self, procedure: impl Into<String>, fetcher: F)
    where
        F: Fn(QueryKey) -> BoxFuture<'static, Result<Value, DomainError>> + Send + Sync + 'static,
    {
        self.fetchers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(procedure.into(), Arc::new(fetcher));
    }

    /// Stores a fresh value for `key`
    pub async fn set(&self, key: QueryKey, value: Value) {
        self.entries.insert(key, CachedQuery::fresh(value)).await;
    }

    pub async fn get(&self, key: &QueryKey) -> Option<CachedQuery> {
        self.entries.get(key).await
    }

    /// Returns true if the entry exists and has been invalidated
    pub async fn is_stale(&self, key: &QueryKey) -> bool {
        self.entries
            .get(key)
            .await
            .map(|entry| entry.stale)
            .unwrap_or(false)
    }

    /// Returns the cached value, fetching it when missing or stale
    pub async fn fetch(&self, key: QueryKey) -> Result<Value, DomainError> {
        if let Some(entry) = self.entries.get(&key).await {
            if !entry.stale {
                return Ok(entry.value);
            }
        }

        let fetcher = self
            .fetcher_for(&key)
            .ok_or_else(|| DomainError::cache(format!("No fetcher for query '{}'", key)))?;

        let value = fetcher(key.clone()).await?;
        self.set(key, value.clone()).await;
        Ok(value)
    }

    /// Number of cached entries
    pub async fn len(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn fetcher_for(&self, key: &QueryKey) -> Option<QueryFetcher> {
        self.fetchers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key.procedure())
            .cloned()
    }

    async fn matching_keys(&self, pattern: &QueryKeyPattern) -> Vec<QueryKey> {
        self.entries.run_pending_tasks().await;

        self.entries
            .iter()
            .filter(|(key, _)| pattern.matches(key))
            .map(|(key, _)| key.as_ref().clone())
            .collect()
    }

    async fn mark_stale(&self, key: QueryKey) {
        if let Some(mut entry) = self.entries.get(&key).await {
            entry.stale = true;
            self.entries.insert(key, entry).await;
        }
    }
}

#[async_trait]
impl CacheAdapter for InMemoryQueryCache {
    async fn invalidate(&self, pattern: &QueryKeyPattern) -> Result<(), DomainError> {
        let keys = self.matching_keys(pattern).await;

        debug!(pattern = %pattern, matched = keys.len(), "Marking queries stale");

        for key in keys {
            self.mark_stale(key).await;
        }

        Ok(())
    }

    async fn refetch(&self, pattern: &QueryKeyPattern) -> Result<(), DomainError> {
        let keys = self.matching_keys(pattern).await;

        debug!(pattern = %pattern, matched = keys.len(), "Refetching queries");

        for key in keys {
            match self.fetcher_for(&key) {
                Some(fetcher) => {
                    let value = fetcher(key.clone()).await.map_err(|e| {
                        DomainError::cache(format!("Refetch of '{}' failed: {}", key, e))
                    })?;
                    self.set(key, value).await;
                }
                None => self.mark_stale(key).await,
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicI64, Ordering};

    fn counting_fetcher(
        counter: Arc<AtomicI64>,
    ) -> impl Fn(QueryKey) -> BoxFuture<'static, Result<Value, DomainError>> + Send + Sync + 'static
    {
        move |_key| -> BoxFuture<'static, Result<Value, DomainError>> {
            let counter = counter.clone();
            Box::pin(async move {
                Ok::<Value, DomainError>(json!(counter.fetch_add(1, Ordering::SeqCst) + 1))
            })
        }
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = InMemoryQueryCache::new();
        let key = QueryKey::new("items");

        cache.set(key.clone(), json!([1, 2])).await;

        let entry = cache.get(&key).await.unwrap();
        assert_eq!(entry.value, json!([1, 2]));
        assert!(!entry.stale);
    }

    #[tokio::test]
    async fn test_invalidate_prefix_marks_family_stale() {
        let cache = InMemoryQueryCache::new();
        let list = QueryKey::new("items.list");
        let detail = QueryKey::new("items.byId").with_input(&json!({"id": 1}));
        let other = QueryKey::new("users.list");

        cache.set(list.clone(), json!([])).await;
        cache.set(detail.clone(), json!({})).await;
        cache.set(other.clone(), json!([])).await;

        cache.invalidate(&QueryKeyPattern::prefix("items")).await.unwrap();

        assert!(cache.is_stale(&list).await);
        assert!(cache.is_stale(&detail).await);
        assert!(!cache.is_stale(&other).await);
    }

    #[tokio::test]
    async fn test_invalidate_exact_leaves_children() {
        let cache = InMemoryQueryCache::new();
        let parent = QueryKey::new("items");
        let child = QueryKey::new("items.byId");

        cache.set(parent.clone(), json!([])).await;
        cache.set(child.clone(), json!({})).await;

        cache.invalidate(&QueryKeyPattern::exact("items")).await.unwrap();

        assert!(cache.is_stale(&parent).await);
        assert!(!cache.is_stale(&child).await);
    }

    #[tokio::test]
    async fn test_patterns_matching_nothing_are_noops() {
        let cache = InMemoryQueryCache::new();

        cache.invalidate(&QueryKeyPattern::prefix("missing")).await.unwrap();
        cache.refetch(&QueryKeyPattern::prefix("missing")).await.unwrap();

        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_refetch_uses_fetcher_and_clears_staleness() {
        let cache = InMemoryQueryCache::new();
        let calls = Arc::new(AtomicI64::new(0));
        cache.register_fetcher("itemCount", counting_fetcher(calls.clone()));

        let key = QueryKey::new("itemCount");
        cache.set(key.clone(), json!(0)).await;
        cache.invalidate(&QueryKeyPattern::prefix("itemCount")).await.unwrap();
        assert!(cache.is_stale(&key).await);

        cache.refetch(&QueryKeyPattern::prefix("itemCount")).await.unwrap();

        let entry = cache.get(&key).await.unwrap();
        assert_eq!(entry.value, json!(1));
        assert!(!entry.stale);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refetch_without_fetcher_marks_stale() {
        let cache = InMemoryQueryCache::new();
        let key = QueryKey::new("items");
        cache.set(key.clone(), json!([])).await;

        cache.refetch(&QueryKeyPattern::prefix("items")).await.unwrap();

        assert!(cache.is_stale(&key).await);
    }

    #[tokio::test]
    async fn test_refetch_failure_is_reported() {
        let cache = InMemoryQueryCache::new();
        cache.register_fetcher("items", |_key| {
            Box::pin(async { Err::<Value, _>(DomainError::cache("backend down")) })
        });
        cache.set(QueryKey::new("items"), json!([])).await;

        let result = cache.refetch(&QueryKeyPattern::prefix("items")).await;

        assert!(matches!(result, Err(DomainError::Cache { .. })));
    }

    #[tokio::test]
    async fn test_fetch_refreshes_only_stale_entries() {
        let cache = InMemoryQueryCache::new();
        let calls = Arc::new(AtomicI64::new(0));
        cache.register_fetcher("items", counting_fetcher(calls.clone()));
        let key = QueryKey::new("items");

        assert_eq!(cache.fetch(key.clone()).await.unwrap(), json!(1));
        assert_eq!(cache.fetch(key.clone()).await.unwrap(), json!(1));

        cache.invalidate(&QueryKeyPattern::prefix("items")).await.unwrap();
        assert_eq!(cache.fetch(key).await.unwrap(), json!(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fetch_without_fetcher_fails() {
        let cache = InMemoryQueryCache::new();

        let result = cache.fetch(QueryKey::new("unknown")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_executor_drives_cache_for_crud_delete() {
        use crate::domain::{patterns, InvalidationExecutor, RuleRegistry};

        let cache = Arc::new(InMemoryQueryCache::new());
        let calls = Arc::new(AtomicI64::new(10));
        cache.register_fetcher("items.count", counting_fetcher(calls));

        let list = QueryKey::new("items.list");
        let detail = QueryKey::new("items.byId").with_input(&json!({"id": 1}));
        let count = QueryKey::new("items.count");
        let unrelated = QueryKey::new("users.list");
        for key in [&list, &detail, &count, &unrelated] {
            cache.set(key.clone(), json!(null)).await;
        }

        let registry = RuleRegistry::new();
        registry
            .register_namespaced("items", patterns::crud("items.list", "items.byId", "items.count"))
            .unwrap();
        let executor = InvalidationExecutor::new(Arc::new(registry));

        let report = executor
            .invalidate(cache.clone(), "items.delete", json!({"id": 1}), None)
            .await
            .unwrap();

        assert_eq!(report.awaited, 3);
        assert!(cache.is_stale(&list).await);
        assert!(cache.is_stale(&detail).await);
        assert!(cache.is_stale(&count).await);
        assert!(!cache.is_stale(&unrelated).await);

        assert_eq!(cache.fetch(count).await.unwrap(), json!(11));
    }
}
