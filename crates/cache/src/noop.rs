//! No-op cache backend: every lookup misses, every write is dropped.

use async_trait::async_trait;
use thirdvoice_core::cache::{CacheEntry, CacheStore};
use thirdvoice_core::error::CacheError;

/// A cache that stores nothing.
pub struct NoopCache;

#[async_trait]
impl CacheStore for NoopCache {
    fn name(&self) -> &str { "none" }

    async fn get(&self, _key: &str) -> Result<Option<CacheEntry>, CacheError> {
        Ok(None)
    }

    async fn put(&self, _entry: CacheEntry) -> Result<(), CacheError> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> Result<bool, CacheError> {
        Ok(false)
    }

    async fn purge_expired(&self) -> Result<usize, CacheError> {
        Ok(0)
    }

    async fn purge_requester(&self, _requester_id: &str) -> Result<usize, CacheError> {
        Ok(0)
    }

    async fn count(&self) -> Result<usize, CacheError> {
        Ok(0)
    }
}
