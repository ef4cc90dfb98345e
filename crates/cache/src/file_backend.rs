//! File-based cache backend: persistent JSON-lines storage.
//!
//! Each line is a JSON-encoded `CacheEntry`. The whole file is loaded on
//! creation and rewritten on every mutation, which suits the small,
//! single-user caches the CLI keeps.
//!
//! Storage location: `~/.thirdvoice/cache/responses.jsonl`

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thirdvoice_core::cache::{CacheEntry, CacheStore};
use thirdvoice_core::error::CacheError;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// A file-backed cache using JSONL (one entry per line).
pub struct FileCache {
    path: PathBuf,
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl FileCache {
    /// Open the cache at `path`. A missing file starts empty and is created
    /// on first write.
    pub fn new(path: PathBuf) -> Self {
        let entries = Self::load_from_disk(&path);
        debug!(path = %path.display(), count = entries.len(), "File cache loaded");
        Self {
            path,
            entries: Arc::new(RwLock::new(entries)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_from_disk(path: &Path) -> HashMap<String, CacheEntry> {
        let Ok(content) = std::fs::read_to_string(path) else {
            return HashMap::new();
        };

        let now = Utc::now();
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<CacheEntry>(line) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, "Skipping corrupted cache line");
                    None
                }
            })
            .filter(|entry| !entry.is_expired_at(now))
            .map(|entry| (entry.key.clone(), entry))
            .collect()
    }

    async fn flush(&self, entries: &HashMap<String, CacheEntry>) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                CacheError::Storage(format!("Failed to create cache directory: {e}"))
            })?;
        }

        let mut content = String::new();
        for entry in entries.values() {
            let line = serde_json::to_string(entry)
                .map_err(|e| CacheError::Serialization(e.to_string()))?;
            content.push_str(&line);
            content.push('\n');
        }

        tokio::fs::write(&self.path, content)
            .await
            .map_err(|e| CacheError::Storage(format!("Failed to write cache file: {e}")))
    }
}

#[async_trait]
impl CacheStore for FileCache {
    fn name(&self) -> &str {
        "file"
    }

    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).filter(|e| !e.is_expired()).cloned())
    }

    async fn put(&self, entry: CacheEntry) -> Result<(), CacheError> {
        let mut entries = self.entries.write().await;
        entries.insert(entry.key.clone(), entry);
        self.flush(&entries).await
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let mut entries = self.entries.write().await;
        let removed = entries.remove(key).is_some();
        if removed {
            self.flush(&entries).await?;
        }
        Ok(removed)
    }

    async fn purge_expired(&self) -> Result<usize, CacheError> {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| !e.is_expired_at(now));
        let removed = before - entries.len();
        if removed > 0 {
            self.flush(&entries).await?;
        }
        Ok(removed)
    }

    async fn purge_requester(&self, requester_id: &str) -> Result<usize, CacheError> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| e.requester_id != requester_id);
        let removed = before - entries.len();
        if removed > 0 {
            self.flush(&entries).await?;
        }
        Ok(removed)
    }

    async fn count(&self) -> Result<usize, CacheError> {
        Ok(self.entries.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use thirdvoice_core::{AnalysisResult, Depth};

    fn entry(key: &str) -> CacheEntry {
        let result = AnalysisResult {
            rewritten_text: "I'd like us to talk calmly.".into(),
            healing_score: 8,
            depth: Depth::Deep,
            provider_used: "DeepSeek Chat v3.1".into(),
            provider_id: "deepseek/deepseek-chat-v3.1:free".into(),
            ..Default::default()
        };
        CacheEntry::new(key, result, Duration::days(7))
    }

    #[tokio::test]
    async fn entries_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("responses.jsonl");

        let cache = FileCache::new(path.clone());
        cache.put(entry("k1")).await.unwrap();
        cache.put(entry("k2")).await.unwrap();
        drop(cache);

        let reopened = FileCache::new(path);
        assert_eq!(reopened.count().await.unwrap(), 2);
        let hit = reopened.get("k1").await.unwrap().unwrap();
        assert_eq!(hit.result.healing_score, 8);
        assert_eq!(hit.result.depth, Depth::Deep);
    }

    #[tokio::test]
    async fn corrupted_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("responses.jsonl");
        let good = serde_json::to_string(&entry("ok")).unwrap();
        std::fs::write(&path, format!("{good}\nnot json at all\n\n")).unwrap();

        let cache = FileCache::new(path);
        assert_eq!(cache.count().await.unwrap(), 1);
        assert!(cache.get("ok").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn expired_entries_are_dropped_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("responses.jsonl");
        let stale = CacheEntry::new("stale", AnalysisResult::default(), Duration::seconds(-5));
        std::fs::write(&path, serde_json::to_string(&stale).unwrap()).unwrap();

        let cache = FileCache::new(path);
        assert_eq!(cache.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn purge_requester_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("responses.jsonl");

        let cache = FileCache::new(path.clone());
        cache.put(entry("a").with_owner("c", "user-1")).await.unwrap();
        cache.put(entry("b").with_owner("c", "user-2")).await.unwrap();
        assert_eq!(cache.purge_requester("user-1").await.unwrap(), 1);

        let reopened = FileCache::new(path);
        assert!(reopened.get("a").await.unwrap().is_none());
        assert!(reopened.get("b").await.unwrap().is_some());
    }
}
