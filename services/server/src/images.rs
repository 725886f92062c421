//! Fetch-through image serving.
//!
//! Validate, then serve from cache, then fall back to a coalesced fetch from
//! the object store that populates the cache for subsequent requests.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, warn};
use wxviewer_object_store::{ObjectStore, ObjectStoreError};
use wxviewer_pass::{ImageKey, ImageKeyError};

use crate::cache::ImageCache;
use crate::catalog::PassCatalog;
use crate::fetch::{FetchConfig, FetchCoordinator, FetchError};
use crate::metrics::Metrics;
use crate::validate::validate_path;

/// Errors from serving one image request.
#[derive(Debug, Error)]
pub enum ImageError {
    /// The request path is malformed or names an unknown pass.
    #[error("invalid image request: {0}")]
    Invalid(#[from] ImageKeyError),

    /// The request is valid but the object does not exist.
    #[error("image not found: {0}")]
    NotFound(String),

    #[error("object store unavailable: {0}")]
    Unavailable(#[source] Arc<ObjectStoreError>),

    #[error("image fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("image fetch abandoned")]
    Abandoned,
}

impl From<FetchError> for ImageError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::NotFound(key) => ImageError::NotFound(key),
            FetchError::Store(e) => ImageError::Unavailable(e),
            FetchError::Timeout(d) => ImageError::Timeout(d),
            FetchError::Abandoned => ImageError::Abandoned,
        }
    }
}

/// A successfully served image.
#[derive(Debug, Clone)]
pub struct ServedImage {
    pub payload: Bytes,
    pub cache_hit: bool,
}

/// Serves images for validated request paths.
pub struct ImageService {
    catalog: Arc<PassCatalog>,
    cache: Arc<ImageCache>,
    store: Arc<dyn ObjectStore>,
    coordinator: FetchCoordinator<ImageKey, Bytes>,
    metrics: Metrics,
}

impl ImageService {
    pub fn new(
        catalog: Arc<PassCatalog>,
        cache: Arc<ImageCache>,
        store: Arc<dyn ObjectStore>,
        fetch: FetchConfig,
        metrics: Metrics,
    ) -> Self {
        Self {
            catalog,
            cache,
            store,
            coordinator: FetchCoordinator::new(fetch),
            metrics,
        }
    }

    /// Serve the image at `path` (`{pass}/{pass}-{enhancement}.webp`).
    pub async fn serve(&self, path: &str) -> Result<ServedImage, ImageError> {
        let key = validate_path(path, &self.catalog.snapshot())?;

        if let Some(payload) = self.cache.lookup(&key).await {
            self.metrics.cache_hits.inc();
            return Ok(ServedImage {
                payload,
                cache_hit: true,
            });
        }
        self.metrics.cache_misses.inc();

        let payload = self
            .coordinator
            .ensure_fetch(key.clone(), || self.fetch(key.clone()))
            .await
            .inspect_err(|e| match e {
                FetchError::NotFound(_) => debug!(key = %key, "Image not in object store"),
                _ => warn!(key = %key, error = %e, "Image fetch failed"),
            })?;

        Ok(ServedImage {
            payload,
            cache_hit: false,
        })
    }

    /// Leader side of a fetch: download and cache the object.
    async fn fetch(&self, key: ImageKey) -> Result<Bytes, FetchError> {
        // A previous leader may have finished between our lookup and
        // registration.
        if let Some(payload) = self.cache.lookup(&key).await {
            return Ok(payload);
        }

        let payload = self.store.get_object(&key.object_key()).await?;
        self.cache.insert(key, payload.clone()).await;
        Ok(payload)
    }

    pub fn cache(&self) -> &ImageCache {
        &self.cache
    }

    /// Number of image fetches currently outstanding.
    pub fn in_flight(&self) -> usize {
        self.coordinator.in_flight_count()
    }
}
