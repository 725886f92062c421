//! wxviewer
//!
//! Serves satellite pass images from an S3-compatible bucket through an
//! in-memory cache, together with the pass listing and the static frontend.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use wxviewer_object_store::{ObjectStore, S3Client};
use wxviewer_server::{
    api,
    cache::ImageCache,
    catalog::{CatalogConfig, PassCatalog},
    config,
    images::ImageService,
    metrics::Metrics,
    refresh::RefreshWorker,
    state::AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = config::Config::from_env()?;

    // Initialize tracing (prefer RUST_LOG, fallback to WXVIEWER_LOG_LEVEL)
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting wxviewer");
    info!(
        listen_addr = %config.listen_addr,
        bucket = %config.s3.bucket,
        endpoint = %config.s3.endpoint,
        cache_entries = config.cache.max_entries,
        cache_bytes = config.cache.max_bytes,
        "Configuration loaded"
    );

    let store: Arc<dyn ObjectStore> =
        Arc::new(S3Client::new(config.s3.clone()).context("Failed to create S3 client")?);

    // The initial listing must succeed before anything is served.
    let catalog_config = CatalogConfig::default();
    let refresh_interval = catalog_config.staleness_window;
    let catalog = match PassCatalog::load(store.clone(), catalog_config).await {
        Ok(catalog) => {
            info!(passes = catalog.len(), "Pass catalog loaded");
            Arc::new(catalog)
        }
        Err(e) => {
            error!(error = %e, "Failed to load pass catalog");
            return Err(e.into());
        }
    };

    let metrics = Metrics::new().context("Failed to register metrics")?;
    let cache = Arc::new(ImageCache::new(config.cache.clone()));
    let images = ImageService::new(
        catalog.clone(),
        cache,
        store,
        config.fetch.clone(),
        metrics.clone(),
    );

    // Create shutdown channel for graceful shutdown
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Start catalog refresh worker in background
    let refresh_worker = RefreshWorker::new(catalog.clone(), metrics.clone(), refresh_interval);
    let refresh_handle = tokio::spawn({
        let shutdown_rx = shutdown_rx.clone();
        async move {
            refresh_worker.run(shutdown_rx).await;
        }
    });

    let state = AppState::new(catalog, images, metrics);
    let app = api::create_router(state, &config.static_dir);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!(addr = %config.listen_addr, "Listening for connections");

    // Spawn the server with graceful shutdown
    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let mut shutdown_rx = shutdown_rx;
                loop {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                    if shutdown_rx.changed().await.is_err() {
                        break;
                    }
                }
                info!("HTTP server shutting down");
            })
            .await
    });

    // Wait for shutdown signal (Ctrl+C)
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
        result = server_handle => {
            match result {
                Ok(Ok(())) => info!("Server exited normally"),
                Ok(Err(e)) => error!(error = %e, "Server error"),
                Err(e) => error!(error = %e, "Server task panicked"),
            }
        }
    }

    // Signal shutdown to the worker
    let _ = shutdown_tx.send(true);

    if let Err(e) = tokio::time::timeout(Duration::from_secs(10), refresh_handle).await {
        warn!(error = %e, "Catalog refresh worker did not shut down in time");
    }

    info!("wxviewer shutdown complete");
    Ok(())
}
