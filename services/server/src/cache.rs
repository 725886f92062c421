//! In-memory image cache with FIFO eviction under two independent bounds.
//!
//! Entries are evicted strictly in insertion order, oldest first, until both
//! the entry count and the byte total are within their limits. Lookups never
//! reorder entries, so a frequently served image is evicted as soon as enough
//! newer images arrive.

use std::collections::{HashMap, VecDeque};

use bytes::Bytes;
use tokio::sync::RwLock;
use tracing::debug;
use wxviewer_pass::ImageKey;

/// Configuration for the image cache.
#[derive(Debug, Clone)]
pub struct ImageCacheConfig {
    /// Maximum number of resident images.
    pub max_entries: usize,
    /// Maximum total payload size in bytes.
    pub max_bytes: u64,
}

impl Default for ImageCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 100,
            max_bytes: 100 * 1024 * 1024, // 100 MiB
        }
    }
}

/// A cached image.
#[derive(Debug)]
struct CacheEntry {
    payload: Bytes,
    size_bytes: u64,
}

/// Point-in-time view of the cache, for observability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub bytes: u64,
    /// Highest resident entry count ever observed after an insert.
    pub peak_entries: usize,
    /// Highest resident byte total ever observed after an insert.
    pub peak_bytes: u64,
    pub evictions: u64,
    pub max_entries: usize,
    pub max_bytes: u64,
}

/// Result of one insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertOutcome {
    /// Entries removed to restore the bounds, possibly including the one
    /// just inserted.
    pub evicted: usize,
}

#[derive(Debug, Default)]
struct CacheInner {
    /// Keys in insertion order, oldest at the front.
    order: VecDeque<ImageKey>,
    entries: HashMap<ImageKey, CacheEntry>,
    total_bytes: u64,
    peak_entries: usize,
    peak_bytes: u64,
    evictions: u64,
}

impl CacheInner {
    fn evict_to_bounds(&mut self, config: &ImageCacheConfig) -> usize {
        let mut evicted = 0;
        while self.entries.len() > config.max_entries || self.total_bytes > config.max_bytes {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            if let Some(entry) = self.entries.remove(&oldest) {
                self.total_bytes -= entry.size_bytes;
                evicted += 1;
                debug!(key = %oldest, size = entry.size_bytes, "Evicted image");
            }
        }
        self.evictions += evicted as u64;
        evicted
    }
}

/// Image cache manager.
pub struct ImageCache {
    config: ImageCacheConfig,
    inner: RwLock<CacheInner>,
}

impl ImageCache {
    /// Create a new, empty image cache.
    pub fn new(config: ImageCacheConfig) -> Self {
        Self {
            config,
            inner: RwLock::new(CacheInner::default()),
        }
    }

    pub fn config(&self) -> &ImageCacheConfig {
        &self.config
    }

    /// Look up a cached image. Has no effect on eviction order.
    pub async fn lookup(&self, key: &ImageKey) -> Option<Bytes> {
        let inner = self.inner.read().await;
        inner.entries.get(key).map(|e| e.payload.clone())
    }

    /// Insert an image, then evict oldest entries until both bounds hold.
    ///
    /// Re-inserting a resident key replaces its payload in place; its
    /// position in the eviction order is unchanged.
    pub async fn insert(&self, key: ImageKey, payload: Bytes) -> InsertOutcome {
        let size_bytes = payload.len() as u64;
        let mut inner = self.inner.write().await;

        match inner.entries.get_mut(&key) {
            Some(existing) => {
                let old_size = std::mem::replace(&mut existing.size_bytes, size_bytes);
                existing.payload = payload;
                inner.total_bytes = inner.total_bytes - old_size + size_bytes;
            }
            None => {
                inner.order.push_back(key.clone());
                inner
                    .entries
                    .insert(key, CacheEntry { payload, size_bytes });
                inner.total_bytes += size_bytes;
            }
        }

        let evicted = inner.evict_to_bounds(&self.config);

        inner.peak_entries = inner.peak_entries.max(inner.entries.len());
        inner.peak_bytes = inner.peak_bytes.max(inner.total_bytes);

        debug!(
            entries = inner.entries.len(),
            bytes = inner.total_bytes,
            evicted,
            "Image cached"
        );

        InsertOutcome { evicted }
    }

    /// Get cache statistics.
    pub async fn stats(&self) -> CacheStats {
        let inner = self.inner.read().await;
        CacheStats {
            entries: inner.entries.len(),
            bytes: inner.total_bytes,
            peak_entries: inner.peak_entries,
            peak_bytes: inner.peak_bytes,
            evictions: inner.evictions,
            max_entries: self.config.max_entries,
            max_bytes: self.config.max_bytes,
        }
    }

    /// Resident keys, oldest first.
    pub async fn keys(&self) -> Vec<ImageKey> {
        self.inner.read().await.order.iter().cloned().collect()
    }

    #[cfg(test)]
    async fn assert_consistent(&self) {
        let inner = self.inner.read().await;
        assert_eq!(inner.order.len(), inner.entries.len());
        assert!(inner.order.iter().all(|k| inner.entries.contains_key(k)));
        let sum: u64 = inner.entries.values().map(|e| e.size_bytes).sum();
        assert_eq!(sum, inner.total_bytes);
        assert!(inner.entries.len() <= self.config.max_entries);
        assert!(inner.total_bytes <= self.config.max_bytes);
    }
}
