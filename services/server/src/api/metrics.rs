//! Prometheus scrape endpoint and request accounting middleware.

use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tracing::error;

use super::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/metrics", get(scrape))
}

async fn scrape(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let stats = state.images().cache().stats().await;
    state
        .metrics()
        .observe_state(&stats, &state.catalog().snapshot());

    let body = state.metrics().render().map_err(|e| {
        error!(error = %e, "Failed to encode metrics");
        ApiError::internal("metrics_encode")
    })?;

    Ok(([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body))
}

/// Short, fixed label for a matched route; keeps label cardinality bounded.
fn api_label(route: Option<&str>) -> &'static str {
    match route {
        Some("/api/list") => "list",
        Some("/images/" | "/images/{*path}") => "images",
        Some("/metrics") => "metrics",
        Some("/healthz" | "/readyz" | "/livez") => "health",
        _ => "static",
    }
}

/// Counts every response by route and status, and times it.
pub async fn track_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let start = Instant::now();
    let api = api_label(request.extensions().get::<MatchedPath>().map(MatchedPath::as_str));

    let response = next.run(request).await;

    state.metrics().record_request(
        api,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );
    response
}
