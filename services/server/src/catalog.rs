//! The set of passes known to exist in the object store.
//!
//! Membership is held in an immutable [`CatalogSnapshot`] that is swapped
//! atomically after every successful refresh. Readers load the current
//! snapshot without locking; only [`PassCatalog::refresh`] serializes, and it
//! never performs more than one remote listing per staleness window.
//!
//! The first load lists every pass. Later refreshes only re-list the tail:
//! passes are uploaded in roughly chronological order, so listing resumes
//! after the pass `rescan_depth` places from the end, which also picks up
//! late uploads that land slightly out of order.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};
use wxviewer_object_store::{ObjectStore, ObjectStoreError, DELIMITER};
use wxviewer_pass::PassId;

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to list passes: {0}")]
    Listing(#[from] ObjectStoreError),
}

/// Catalog configuration.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Minimum interval between two remote listings.
    pub staleness_window: Duration,
    /// How many of the newest known passes an incremental refresh re-lists.
    pub rescan_depth: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            staleness_window: Duration::from_secs(60),
            rescan_depth: 100,
        }
    }
}

/// Immutable view of the catalog at one point in time.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    passes: BTreeSet<PassId>,
    refreshed_at: Option<Instant>,
}

impl CatalogSnapshot {
    pub fn contains(&self, pass: &PassId) -> bool {
        self.passes.contains(pass)
    }

    /// Known passes in ascending order.
    pub fn passes(&self) -> impl Iterator<Item = &PassId> {
        self.passes.iter()
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// True once at least one listing has succeeded.
    pub fn is_loaded(&self) -> bool {
        self.refreshed_at.is_some()
    }

    /// Start time of the newest pass, in Unix seconds.
    pub fn last_pass_time(&self) -> Option<i64> {
        self.passes
            .last()
            .and_then(PassId::start_time)
            .map(|t| t.timestamp())
    }
}

/// Result of a refresh request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The catalog was refreshed within the staleness window; nothing listed.
    Fresh,
    /// A listing ran.
    Refreshed {
        /// Passes returned by the listing.
        listed: usize,
        /// Passes that were not known before.
        added: usize,
    },
}

/// Pass catalog backed by an object store.
pub struct PassCatalog {
    store: Arc<dyn ObjectStore>,
    config: CatalogConfig,
    snapshot: ArcSwap<CatalogSnapshot>,
    refresh_lock: Mutex<()>,
}

impl PassCatalog {
    /// Creates an empty catalog. Nothing is listed until the first refresh.
    pub fn new(store: Arc<dyn ObjectStore>, config: CatalogConfig) -> Self {
        Self {
            store,
            config,
            snapshot: ArcSwap::from_pointee(CatalogSnapshot::default()),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Creates a catalog and performs the initial full listing.
    pub async fn load(
        store: Arc<dyn ObjectStore>,
        config: CatalogConfig,
    ) -> Result<Self, CatalogError> {
        let catalog = Self::new(store, config);
        catalog.refresh().await?;
        Ok(catalog)
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        self.snapshot.load_full()
    }

    pub fn contains(&self, pass: &PassId) -> bool {
        self.snapshot.load().contains(pass)
    }

    /// Known passes in ascending order.
    pub fn list(&self) -> Vec<PassId> {
        self.snapshot.load().passes().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.snapshot.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.load().is_empty()
    }

    pub fn last_pass_time(&self) -> Option<i64> {
        self.snapshot.load().last_pass_time()
    }

    fn is_stale(&self, snapshot: &CatalogSnapshot) -> bool {
        match snapshot.refreshed_at {
            Some(at) => at.elapsed() >= self.config.staleness_window,
            None => true,
        }
    }

    /// Lists new passes if the catalog is older than the staleness window.
    ///
    /// Concurrent callers are serialized; whoever acquires the lock after a
    /// refresh completed sees the fresh snapshot and returns without listing.
    /// On error the catalog keeps its previous contents and stays stale, so
    /// the next call retries.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<RefreshOutcome, CatalogError> {
        if !self.is_stale(&self.snapshot.load()) {
            return Ok(RefreshOutcome::Fresh);
        }

        let _guard = self.refresh_lock.lock().await;

        let current = self.snapshot.load_full();
        if !self.is_stale(&current) {
            return Ok(RefreshOutcome::Fresh);
        }

        // Staleness counts from the start of the listing, not its end.
        let started = Instant::now();
        let start_after = self.rescan_cursor(&current);
        let listed = self.list_from(start_after.clone()).await?;

        let mut passes = current.passes.clone();
        let before = passes.len();
        let listed_count = listed.len();
        passes.extend(listed);
        let added = passes.len() - before;

        self.snapshot.store(Arc::new(CatalogSnapshot {
            passes,
            refreshed_at: Some(started),
        }));

        info!(
            start_after = start_after.as_deref().unwrap_or(""),
            listed = listed_count,
            added,
            total = before + added,
            "Pass catalog refreshed"
        );

        Ok(RefreshOutcome::Refreshed {
            listed: listed_count,
            added,
        })
    }

    /// Where an incremental listing resumes, or `None` for a full listing.
    fn rescan_cursor(&self, snapshot: &CatalogSnapshot) -> Option<String> {
        let len = snapshot.passes.len();
        if len <= self.config.rescan_depth {
            return None;
        }
        snapshot
            .passes
            .iter()
            .nth(len - self.config.rescan_depth)
            .map(|pass| format!("{pass}{DELIMITER}"))
    }

    /// Lists every pass prefix after `start_after`, following pagination.
    async fn list_from(&self, start_after: Option<String>) -> Result<Vec<PassId>, CatalogError> {
        let mut cursor = start_after;
        let mut found = Vec::new();

        loop {
            let page = self
                .store
                .list_common_prefixes(cursor.as_deref(), DELIMITER)
                .await?;

            // Only prefixes past the cursor count; a page without any ends
            // the listing even if the store echoed the cursor back.
            let page: Vec<String> = page
                .into_iter()
                .filter(|prefix| cursor.as_deref().is_none_or(|c| prefix.as_str() > c))
                .collect();

            let Some(last) = page.last().cloned() else {
                break;
            };
            debug!(count = page.len(), last = %last, "Listed pass page");

            for prefix in &page {
                let dir = prefix.strip_suffix(DELIMITER).unwrap_or(prefix);
                match PassId::parse(dir) {
                    Ok(pass) => found.push(pass),
                    Err(e) => warn!(prefix = %prefix, error = %e, "Skipping unrecognized prefix"),
                }
            }

            cursor = Some(last);
        }

        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use wxviewer_object_store::MemoryObjectStore;

    fn pass_name(i: i64) -> String {
        let start = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::hours(i);
        let end = start + chrono::Duration::minutes(15);
        format!(
            "{}-{}-NOAA19",
            start.format("%Y%m%d%H%M%S"),
            end.format("%Y%m%d%H%M%S")
        )
    }

    fn put_pass(store: &MemoryObjectStore, name: &str) {
        store.put(format!("{name}/{name}-mcir.webp"), vec![0u8; 4]);
    }

    fn store_with(count: i64) -> Arc<MemoryObjectStore> {
        let store = MemoryObjectStore::new();
        for i in 0..count {
            put_pass(&store, &pass_name(i));
        }
        Arc::new(store)
    }

    async fn load(store: &Arc<MemoryObjectStore>) -> PassCatalog {
        PassCatalog::load(store.clone(), CatalogConfig::default())
            .await
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_lists_all_passes() {
        let store = store_with(3);
        let catalog = load(&store).await;

        assert_eq!(catalog.len(), 3);
        assert!(catalog.snapshot().is_loaded());
        let names: Vec<String> = catalog.list().iter().map(ToString::to_string).collect();
        assert_eq!(names, vec![pass_name(0), pass_name(1), pass_name(2)]);
        // One page, then an empty page.
        assert_eq!(store.list_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_failure_is_an_error() {
        let store = store_with(3);
        store.set_fail_listing(true);
        let result = PassCatalog::load(store.clone(), CatalogConfig::default()).await;
        assert!(matches!(result, Err(CatalogError::Listing(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrecognized_prefixes_are_skipped() {
        let store = store_with(2);
        store.put("thumbnails/index.json", b"{}".to_vec());
        store.put("README", b"loose".to_vec());

        let catalog = load(&store).await;
        assert_eq!(catalog.len(), 2);
        assert!(catalog.list().iter().all(|p| p.satellite() == "NOAA19"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pagination_follows_cursor() {
        let store = MemoryObjectStore::new().with_page_size(2);
        for i in 0..5 {
            put_pass(&store, &pass_name(i));
        }
        let store = Arc::new(store);

        let catalog = load(&store).await;
        assert_eq!(catalog.len(), 5);
        // Pages of 2, 2, 1, then an empty page.
        assert_eq!(store.list_calls(), 4);
        assert_eq!(
            store.list_cursors()[1..],
            [
                Some(format!("{}/", pass_name(1))),
                Some(format!("{}/", pass_name(3))),
                Some(format!("{}/", pass_name(4))),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_within_window_does_not_list() {
        let store = store_with(3);
        let catalog = load(&store).await;
        let calls = store.list_calls();

        for _ in 0..5 {
            assert_eq!(catalog.refresh().await.unwrap(), RefreshOutcome::Fresh);
        }
        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(catalog.refresh().await.unwrap(), RefreshOutcome::Fresh);
        assert_eq!(store.list_calls(), calls);

        put_pass(&store, &pass_name(3));
        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(
            catalog.refresh().await.unwrap(),
            RefreshOutcome::Refreshed { listed: 4, added: 1 }
        );
        assert_eq!(catalog.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_counts_from_listing_start() {
        let store = Arc::new(
            MemoryObjectStore::new().with_list_latency(Duration::from_millis(100)),
        );
        put_pass(&store, &pass_name(0));
        let loaded_from = Instant::now();
        let catalog = load(&store).await;
        // A page and an empty page.
        assert_eq!(loaded_from.elapsed(), Duration::from_millis(200));

        put_pass(&store, &pass_name(1));
        tokio::time::advance(Duration::from_secs(60) - loaded_from.elapsed()).await;
        assert_eq!(
            catalog.refresh().await.unwrap(),
            RefreshOutcome::Refreshed { listed: 2, added: 1 }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_refresh_lists_once() {
        let store = Arc::new(
            MemoryObjectStore::new().with_list_latency(Duration::from_millis(100)),
        );
        for i in 0..3 {
            put_pass(&store, &pass_name(i));
        }
        let catalog = Arc::new(PassCatalog::new(store.clone(), CatalogConfig::default()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let catalog = catalog.clone();
            handles.push(tokio::spawn(async move { catalog.refresh().await }));
        }

        let mut refreshed = 0;
        for handle in handles {
            if let RefreshOutcome::Refreshed { .. } = handle.await.unwrap().unwrap() {
                refreshed += 1;
            }
        }
        assert_eq!(refreshed, 1);
        assert_eq!(store.list_calls(), 2);
        assert_eq!(catalog.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_incremental_refresh_resumes_near_tail() {
        let store = store_with(150);
        let catalog = load(&store).await;
        assert_eq!(catalog.len(), 150);
        assert_eq!(store.list_cursors()[0], None);

        put_pass(&store, &pass_name(150));
        tokio::time::advance(Duration::from_secs(60)).await;

        let calls = store.list_calls() as usize;
        let outcome = catalog.refresh().await.unwrap();

        // Resumes after the pass 100 places from the end.
        assert_eq!(
            store.list_cursors()[calls],
            Some(format!("{}/", pass_name(50)))
        );
        assert_eq!(outcome, RefreshOutcome::Refreshed { listed: 100, added: 1 });
        assert_eq!(catalog.len(), 151);
    }

    #[tokio::test(start_paused = true)]
    async fn test_small_catalog_refresh_is_full() {
        let store = store_with(100);
        let catalog = load(&store).await;

        tokio::time::advance(Duration::from_secs(60)).await;
        let calls = store.list_calls() as usize;
        catalog.refresh().await.unwrap();
        assert_eq!(store.list_cursors()[calls], None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_keeps_catalog_and_retries() {
        let store = store_with(3);
        let catalog = load(&store).await;
        let before = catalog.snapshot();

        store.set_fail_listing(true);
        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(catalog.refresh().await.is_err());
        assert_eq!(catalog.len(), 3);
        assert!(Arc::ptr_eq(&before, &catalog.snapshot()));

        // Still stale, so the next call lists again.
        let calls = store.list_calls();
        assert!(catalog.refresh().await.is_err());
        assert_eq!(store.list_calls(), calls + 1);

        store.set_fail_listing(false);
        put_pass(&store, &pass_name(3));
        assert!(matches!(
            catalog.refresh().await.unwrap(),
            RefreshOutcome::Refreshed { added: 1, .. }
        ));
        assert_eq!(catalog.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_pass_time() {
        let store = Arc::new(MemoryObjectStore::new());
        put_pass(&store, "20230101000000-20230101001500-NOAA19");
        put_pass(&store, "20230102000000-20230102001500-NOAA18");
        let catalog = load(&store).await;

        assert_eq!(catalog.last_pass_time(), Some(1_672_617_600));
        assert_eq!(PassCatalog::new(store, CatalogConfig::default()).last_pass_time(), None);
    }
}
