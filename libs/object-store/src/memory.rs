//! In-process object store.
//!
//! Behaves like a bucket listed with a delimiter: keys are kept sorted and
//! prefixes are derived from them on every listing. Call counters, injectable
//! listing failures, and artificial `get` latency make it usable as a test
//! double for code that sits on top of [`ObjectStore`].

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::{ObjectStore, ObjectStoreError};

/// Default number of prefixes per listing page, matching S3's `max-keys`.
const DEFAULT_PAGE_SIZE: usize = 1000;

#[derive(Debug)]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<String, Bytes>>,
    page_size: usize,
    list_latency: Option<Duration>,
    get_latency: Option<Duration>,
    fail_listing: AtomicBool,
    list_calls: AtomicU64,
    get_calls: AtomicU64,
    cursors: Mutex<Vec<Option<String>>>,
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(BTreeMap::new()),
            page_size: DEFAULT_PAGE_SIZE,
            list_latency: None,
            get_latency: None,
            fail_listing: AtomicBool::new(false),
            list_calls: AtomicU64::new(0),
            get_calls: AtomicU64::new(0),
            cursors: Mutex::new(Vec::new()),
        }
    }

    /// Limits how many prefixes one listing call returns.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Delays every `list_common_prefixes` call by `latency`.
    pub fn with_list_latency(mut self, latency: Duration) -> Self {
        self.list_latency = Some(latency);
        self
    }

    /// Delays every `get_object` call by `latency`.
    pub fn with_get_latency(mut self, latency: Duration) -> Self {
        self.get_latency = Some(latency);
        self
    }

    /// Stores `body` under `key`, replacing any previous object.
    pub fn put(&self, key: impl Into<String>, body: impl Into<Bytes>) {
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), body.into());
    }

    /// Makes subsequent listing calls fail until reset.
    pub fn set_fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }

    /// Number of `list_common_prefixes` calls so far, failed ones included.
    pub fn list_calls(&self) -> u64 {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// The `start_after` argument of every listing call so far, in order.
    pub fn list_cursors(&self) -> Vec<Option<String>> {
        self.cursors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of `get_object` calls so far, misses included.
    pub fn get_calls(&self) -> u64 {
        self.get_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn list_common_prefixes(
        &self,
        start_after: Option<&str>,
        delimiter: &str,
    ) -> Result<Vec<String>, ObjectStoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.cursors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(start_after.map(str::to_string));

        if let Some(latency) = self.list_latency {
            tokio::time::sleep(latency).await;
        }

        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(ObjectStoreError::Unavailable(
                "listing failure injected".to_string(),
            ));
        }

        let objects = self.objects.lock().unwrap_or_else(PoisonError::into_inner);
        let prefixes: BTreeSet<String> = objects
            .keys()
            .filter_map(|key| {
                key.find(delimiter)
                    .map(|i| key[..i + delimiter.len()].to_string())
            })
            .filter(|prefix| start_after.is_none_or(|s| prefix.as_str() > s))
            .collect();

        Ok(prefixes.into_iter().take(self.page_size).collect())
    }

    async fn get_object(&self, key: &str) -> Result<Bytes, ObjectStoreError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(latency) = self.get_latency {
            tokio::time::sleep(latency).await;
        }

        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
            .ok_or_else(|| ObjectStoreError::NotFound(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_passes() -> MemoryObjectStore {
        let store = MemoryObjectStore::new().with_page_size(2);
        for pass in ["a-1-X", "b-2-Y", "c-3-Z"] {
            store.put(format!("{pass}/{pass}-mcir.webp"), vec![1u8, 2, 3]);
            store.put(format!("{pass}/{pass}-msa.webp"), vec![4u8]);
        }
        store.put("README", b"loose key".to_vec());
        store
    }

    #[tokio::test]
    async fn test_paginated_prefix_listing() {
        let store = store_with_passes();

        let page = store.list_common_prefixes(None, "/").await.unwrap();
        assert_eq!(page, vec!["a-1-X/", "b-2-Y/"]);

        let page = store.list_common_prefixes(Some("b-2-Y/"), "/").await.unwrap();
        assert_eq!(page, vec!["c-3-Z/"]);

        let page = store.list_common_prefixes(Some("c-3-Z/"), "/").await.unwrap();
        assert!(page.is_empty());

        assert_eq!(store.list_calls(), 3);
        assert_eq!(
            store.list_cursors(),
            vec![None, Some("b-2-Y/".to_string()), Some("c-3-Z/".to_string())]
        );
    }

    #[tokio::test]
    async fn test_get_object() {
        let store = store_with_passes();
        let body = store.get_object("a-1-X/a-1-X-msa.webp").await.unwrap();
        assert_eq!(&body[..], &[4u8]);

        let err = store.get_object("a-1-X/a-1-X-pris.webp").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(store.get_calls(), 2);
    }

    #[tokio::test]
    async fn test_injected_listing_failure() {
        let store = store_with_passes();
        store.set_fail_listing(true);
        assert!(store.list_common_prefixes(None, "/").await.is_err());

        store.set_fail_listing(false);
        assert!(store.list_common_prefixes(None, "/").await.is_ok());
    }
}
