//! Response cache backends for Third Voice.
//!
//! Every backend implements `thirdvoice_core::CacheStore`; the orchestrator
//! only ever sees the trait object built by [`build_from_config`].

pub mod file_backend;
pub mod in_memory;
pub mod noop;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use file_backend::FileCache;
pub use in_memory::InMemoryCache;
pub use noop::NoopCache;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteCache;

use std::sync::Arc;
use thirdvoice_config::CacheConfig;
use thirdvoice_core::cache::CacheStore;
use thirdvoice_core::error::CacheError;
use tracing::warn;

/// Build the cache backend named by `config.backend`.
pub async fn build_from_config(config: &CacheConfig) -> Result<Arc<dyn CacheStore>, CacheError> {
    match config.backend.as_str() {
        "none" => Ok(Arc::new(NoopCache)),
        "file" => Ok(Arc::new(FileCache::new(config.resolved_path()))),
        "sqlite" => open_sqlite(config).await,
        "memory" => Ok(Arc::new(InMemoryCache::new())),
        other => {
            warn!(backend = %other, "Unknown cache backend, using in-memory cache");
            Ok(Arc::new(InMemoryCache::new()))
        }
    }
}

#[cfg(feature = "sqlite")]
async fn open_sqlite(config: &CacheConfig) -> Result<Arc<dyn CacheStore>, CacheError> {
    let path = config.resolved_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| CacheError::Storage(format!("Failed to create cache directory: {e}")))?;
    }
    let url = format!("sqlite://{}", path.display());
    Ok(Arc::new(SqliteCache::new(&url).await?))
}

#[cfg(not(feature = "sqlite"))]
async fn open_sqlite(config: &CacheConfig) -> Result<Arc<dyn CacheStore>, CacheError> {
    warn!("Built without SQLite support, using the JSON-lines file cache");
    let mut file_config = config.clone();
    file_config.backend = "file".into();
    Ok(Arc::new(FileCache::new(file_config.resolved_path())))
}
