//! Prometheus metrics.
//!
//! Every [`Metrics`] value owns its registry, so independent servers (and
//! tests) never collide on metric names. Gauges that mirror cache and catalog
//! state are refreshed when the registry is rendered.

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};

use crate::cache::CacheStats;
use crate::catalog::CatalogSnapshot;

/// Request latency buckets (seconds): 1ms up to 10s.
const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0,
];

/// Container for all server metrics.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,

    pub passes_total: IntGauge,
    /// Start time of the newest pass, Unix seconds.
    pub last_pass_time: IntGauge,

    pub cache_hits: IntCounter,
    pub cache_misses: IntCounter,
    pub images_served: IntCounter,
    /// Labels: type (max, current, highest)
    pub cache_size: IntGaugeVec,
    /// Labels: type (max, current, highest)
    pub cache_size_bytes: IntGaugeVec,

    /// Labels: api, code
    pub api_requests_handled: IntCounterVec,
    /// Labels: api
    pub request_duration_seconds: HistogramVec,

    pub catalog_refresh_failures: IntCounter,
}

impl Metrics {
    /// Create and register all metrics.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let metrics = Self {
            passes_total: IntGauge::new("wxviewer_passes_total", "Number of known passes")?,
            last_pass_time: IntGauge::new(
                "wxviewer_last_pass_time",
                "Start time of the newest known pass, in Unix seconds",
            )?,
            cache_hits: IntCounter::new("wxviewer_cache_hits", "Image requests served from cache")?,
            cache_misses: IntCounter::new(
                "wxviewer_cache_misses",
                "Valid image requests not found in cache",
            )?,
            images_served: IntCounter::new(
                "wxviewer_images_served",
                "Image responses sent with a payload",
            )?,
            cache_size: IntGaugeVec::new(
                Opts::new("wxviewer_cache_size", "Image cache entry counts"),
                &["type"],
            )?,
            cache_size_bytes: IntGaugeVec::new(
                Opts::new("wxviewer_cache_size_bytes", "Image cache sizes in bytes"),
                &["type"],
            )?,
            api_requests_handled: IntCounterVec::new(
                Opts::new("wxviewer_api_requests_handled", "HTTP requests handled"),
                &["api", "code"],
            )?,
            request_duration_seconds: HistogramVec::new(
                HistogramOpts::new(
                    "wxviewer_request_duration_seconds",
                    "HTTP request duration in seconds",
                )
                .buckets(LATENCY_BUCKETS.to_vec()),
                &["api"],
            )?,
            catalog_refresh_failures: IntCounter::new(
                "wxviewer_catalog_refresh_failures",
                "Failed pass catalog refreshes",
            )?,
            registry,
        };

        metrics.register()?;
        Ok(metrics)
    }

    fn register(&self) -> Result<(), prometheus::Error> {
        let r = &self.registry;
        r.register(Box::new(self.passes_total.clone()))?;
        r.register(Box::new(self.last_pass_time.clone()))?;
        r.register(Box::new(self.cache_hits.clone()))?;
        r.register(Box::new(self.cache_misses.clone()))?;
        r.register(Box::new(self.images_served.clone()))?;
        r.register(Box::new(self.cache_size.clone()))?;
        r.register(Box::new(self.cache_size_bytes.clone()))?;
        r.register(Box::new(self.api_requests_handled.clone()))?;
        r.register(Box::new(self.request_duration_seconds.clone()))?;
        r.register(Box::new(self.catalog_refresh_failures.clone()))?;
        Ok(())
    }

    /// Record a handled HTTP request.
    pub fn record_request(&self, api: &str, code: u16, duration_secs: f64) {
        let code = code.to_string();
        self.api_requests_handled
            .with_label_values(&[api, code.as_str()])
            .inc();
        self.request_duration_seconds
            .with_label_values(&[api])
            .observe(duration_secs);
    }

    /// Copy current cache and catalog state into the gauges.
    pub fn observe_state(&self, cache: &CacheStats, catalog: &CatalogSnapshot) {
        self.passes_total.set(catalog.len() as i64);
        if let Some(t) = catalog.last_pass_time() {
            self.last_pass_time.set(t);
        }

        let counts = [
            ("max", cache.max_entries as i64),
            ("current", cache.entries as i64),
            ("highest", cache.peak_entries as i64),
        ];
        for (kind, value) in counts {
            self.cache_size.with_label_values(&[kind]).set(value);
        }

        let bytes = [
            ("max", cache.max_bytes as i64),
            ("current", cache.bytes as i64),
            ("highest", cache.peak_bytes as i64),
        ];
        for (kind, value) in bytes {
            self.cache_size_bytes.with_label_values(&[kind]).set(value);
        }
    }

    /// Render the registry in the Prometheus text format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
