//! Cache layer
//!
//! In-process moka cache shared by the services. Values are stored as JSON
//! so any serializable type can be cached under a string key.
//!
//! # Usage
//!
//! ```rust,ignore
//! use adminhub::cache::{create_cache, CacheLayer};
//! use adminhub::config::CacheConfig;
//!
//! let cache = create_cache(&CacheConfig::default());
//! cache.set("dashboard:stats", &stats, Duration::from_secs(60)).await?;
//! ```

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::CacheConfig;

pub use memory::MemoryCache;

/// Cache layer trait
///
/// Generic methods keep this trait from being object safe; share the
/// concrete cache behind an `Arc` instead.
#[async_trait]
pub trait CacheLayer: Send + Sync {
    /// Get a value from cache
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>>;

    /// Set a value in cache with TTL
    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: Duration) -> Result<()>;

    /// Delete a value from cache
    async fn delete(&self, key: &str) -> Result<()>;

    /// Delete all values whose key matches a glob pattern (`*`, `?`)
    async fn delete_pattern(&self, pattern: &str) -> Result<()>;

    /// Clear all cache entries
    async fn clear(&self) -> Result<()>;
}

/// Cache handle shared across services
pub type SharedCache = Arc<MemoryCache>;

/// Build the cache from configuration
pub fn create_cache(config: &CacheConfig) -> SharedCache {
    let ttl = Duration::from_secs(config.ttl_seconds);
    Arc::new(MemoryCache::with_capacity_and_ttl(config.max_capacity, ttl))
}
