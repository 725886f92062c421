//! Catalog refresh background worker.
//!
//! Keeps the pass catalog warm so `/api/list` rarely has to wait on a
//! listing. The catalog's own staleness check still applies, so ticks that
//! land inside the window are free.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::catalog::{PassCatalog, RefreshOutcome};
use crate::metrics::Metrics;

/// Worker that periodically refreshes the pass catalog.
pub struct RefreshWorker {
    catalog: Arc<PassCatalog>,
    metrics: Metrics,
    interval: Duration,
}

impl RefreshWorker {
    pub fn new(catalog: Arc<PassCatalog>, metrics: Metrics, interval: Duration) -> Self {
        Self {
            catalog,
            metrics,
            interval,
        }
    }

    /// Run the refresh worker until shutdown is signaled.
    #[instrument(skip(self, shutdown))]
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Starting catalog refresh worker"
        );

        let mut interval = tokio::time::interval(self.interval);
        // The catalog was just loaded; skip the immediate first tick.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => self.refresh_once().await,
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("Catalog refresh worker shutting down");
                        break;
                    }
                }
            }
        }
    }

    async fn refresh_once(&self) {
        match self.catalog.refresh().await {
            Ok(RefreshOutcome::Refreshed { listed, added }) => {
                debug!(listed, added, "Background catalog refresh complete");
            }
            Ok(RefreshOutcome::Fresh) => {}
            Err(e) => {
                self.metrics.catalog_refresh_failures.inc();
                warn!(error = %e, "Background catalog refresh failed");
            }
        }
    }
}
