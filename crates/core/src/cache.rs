//! Cache trait: TTL-bound storage of provider-generated results.
//!
//! Entries are written once after a successful parse and read on every
//! request before any provider is contacted. They are never mutated: a newer
//! result for the same key replaces the entry, and stale entries simply stop
//! being returned once `expires_at` has passed.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use crate::analysis::AnalysisResult;
use crate::error::CacheError;

/// Last representable expiry: 9999-12-31T23:59:59Z.
///
/// Later instants render with a leading `+` in RFC 3339 and would no longer
/// sort correctly as text.
pub fn latest_expiry() -> DateTime<Utc> {
    DateTime::from_timestamp(253_402_300_799, 0).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// A single cached result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Digest of (message, context, operation, depth)
    pub key: String,

    /// The provider-generated result
    pub result: AnalysisResult,

    /// Person the analysed message was about
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub subject_id: String,

    /// Person who asked for the analysis
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub requester_id: String,

    /// When this entry was written
    pub created_at: DateTime<Utc>,

    /// After this instant the entry is treated as a miss
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Create an entry that expires `ttl` from now.
    pub fn new(key: impl Into<String>, result: AnalysisResult, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            key: key.into(),
            result,
            subject_id: String::new(),
            requester_id: String::new(),
            created_at: now,
            expires_at: now
                .checked_add_signed(ttl)
                .filter(|at| *at <= latest_expiry())
                .unwrap_or_else(latest_expiry),
        }
    }

    /// Record who the entry belongs to.
    pub fn with_owner(mut self, subject_id: &str, requester_id: &str) -> Self {
        self.subject_id = subject_id.to_string();
        self.requester_id = requester_id.to_string();
        self
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// The core CacheStore trait.
///
/// Implementations: in-memory, JSON-lines file, SQLite, none (no-op).
/// All must tolerate concurrent reads and writes from in-flight requests.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// The backend name (e.g., "memory", "sqlite", "none").
    fn name(&self) -> &str;

    /// Fetch a live entry. Expired entries are reported as `None`.
    async fn get(&self, key: &str) -> std::result::Result<Option<CacheEntry>, CacheError>;

    /// Insert or replace the entry stored under `entry.key`.
    async fn put(&self, entry: CacheEntry) -> std::result::Result<(), CacheError>;

    /// Remove an entry. Returns whether anything was removed.
    async fn delete(&self, key: &str) -> std::result::Result<bool, CacheError>;

    /// Drop every expired entry, returning how many were removed.
    async fn purge_expired(&self) -> std::result::Result<usize, CacheError>;

    /// Drop every entry written on behalf of `requester_id`.
    async fn purge_requester(&self, requester_id: &str) -> std::result::Result<usize, CacheError>;

    /// Number of stored entries, expired ones included.
    async fn count(&self) -> std::result::Result<usize, CacheError>;
}
