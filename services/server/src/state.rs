//! Application state shared across request handlers.

use std::sync::Arc;

use crate::catalog::PassCatalog;
use crate::images::ImageService;
use crate::metrics::Metrics;

/// Shared application state.
///
/// This is passed to all request handlers via Axum's state extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    catalog: Arc<PassCatalog>,
    images: ImageService,
    metrics: Metrics,
}

impl AppState {
    pub fn new(catalog: Arc<PassCatalog>, images: ImageService, metrics: Metrics) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                catalog,
                images,
                metrics,
            }),
        }
    }

    pub fn catalog(&self) -> &PassCatalog {
        &self.inner.catalog
    }

    pub fn images(&self) -> &ImageService {
        &self.inner.images
    }

    pub fn metrics(&self) -> &Metrics {
        &self.inner.metrics
    }
}
