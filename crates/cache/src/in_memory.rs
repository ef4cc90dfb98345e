//! In-memory cache backend. Process lifetime only.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use thirdvoice_core::cache::{CacheEntry, CacheStore};
use thirdvoice_core::error::CacheError;
use tokio::sync::RwLock;

/// Keyed entries behind a tokio `RwLock`; lookups from concurrent requests
/// only take the read side.
pub struct InMemoryCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for InMemoryCache {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).filter(|e| !e.is_expired()).cloned())
    }

    /// Expired entries are swept on every write so a long-lived cache stays bounded.
    async fn put(&self, entry: CacheEntry) -> Result<(), CacheError> {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, e| !e.is_expired_at(now));
        entries.insert(entry.key.clone(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn purge_expired(&self) -> Result<usize, CacheError> {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| !e.is_expired_at(now));
        Ok(before - entries.len())
    }

    async fn purge_requester(&self, requester_id: &str) -> Result<usize, CacheError> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| e.requester_id != requester_id);
        Ok(before - entries.len())
    }

    async fn count(&self) -> Result<usize, CacheError> {
        Ok(self.entries.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use thirdvoice_core::AnalysisResult;

    fn entry(key: &str, ttl: Duration) -> CacheEntry {
        let result = AnalysisResult {
            rewritten_text: format!("result for {key}"),
            ..Default::default()
        };
        CacheEntry::new(key, result, ttl)
    }

    #[tokio::test]
    async fn put_then_get() {
        let cache = InMemoryCache::new();
        cache.put(entry("a", Duration::days(7))).await.unwrap();

        let hit = cache.get("a").await.unwrap().unwrap();
        assert_eq!(hit.result.rewritten_text, "result for a");
        assert!(cache.get("b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn put_replaces_existing_key() {
        let cache = InMemoryCache::new();
        cache.put(entry("a", Duration::days(7))).await.unwrap();
        let mut newer = entry("a", Duration::days(7));
        newer.result.rewritten_text = "newer".into();
        cache.put(newer).await.unwrap();

        assert_eq!(cache.count().await.unwrap(), 1);
        assert_eq!(cache.get("a").await.unwrap().unwrap().result.rewritten_text, "newer");
    }

    #[tokio::test]
    async fn expired_entries_miss_and_purge() {
        let cache = InMemoryCache::new();
        cache.put(entry("fresh", Duration::days(1))).await.unwrap();
        cache.put(entry("old", Duration::seconds(-1))).await.unwrap();

        assert!(cache.get("old").await.unwrap().is_none());
        assert_eq!(cache.purge_expired().await.unwrap(), 1);
        assert_eq!(cache.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn put_evicts_expired_entries() {
        let cache = InMemoryCache::new();
        for i in 0..5 {
            cache.put(entry(&format!("stale-{i}"), Duration::seconds(-1))).await.unwrap();
        }
        assert_eq!(cache.count().await.unwrap(), 1);

        cache.put(entry("fresh", Duration::days(1))).await.unwrap();
        assert_eq!(cache.count().await.unwrap(), 1);
        assert!(cache.get("fresh").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn purge_by_requester() {
        let cache = InMemoryCache::new();
        cache
            .put(entry("a", Duration::days(1)).with_owner("c1", "u1"))
            .await
            .unwrap();
        cache
            .put(entry("b", Duration::days(1)).with_owner("c2", "u2"))
            .await
            .unwrap();

        assert_eq!(cache.purge_requester("u1").await.unwrap(), 1);
        assert!(cache.get("a").await.unwrap().is_none());
        assert!(cache.get("b").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn delete_reports_presence() {
        let cache = InMemoryCache::new();
        cache.put(entry("a", Duration::days(1))).await.unwrap();
        assert!(cache.delete("a").await.unwrap());
        assert!(!cache.delete("a").await.unwrap());
    }
}
