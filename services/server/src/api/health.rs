//! Health check endpoints.
//!
//! These endpoints are used by load balancers and orchestration systems
//! to determine if the service is healthy and ready to receive traffic.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct HealthResponse {
    /// Service status: "ok" or "degraded".
    pub status: String,

    pub service: String,

    pub version: String,

    /// Current timestamp (ISO 8601).
    pub timestamp: String,

    /// Catalog details, on readiness checks only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<CatalogHealth>,
}

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct CatalogHealth {
    pub loaded: bool,
    pub passes: usize,
}

/// Create health check routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/livez", get(livez))
}

fn response(status: &str, catalog: Option<CatalogHealth>) -> HealthResponse {
    HealthResponse {
        status: status.to_string(),
        service: "wxviewer".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
        catalog,
    }
}

/// Basic health check - is the service running?
async fn healthz() -> impl IntoResponse {
    Json(response("ok", None))
}

/// Readiness check: 503 until the pass catalog has been loaded once.
async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.catalog().snapshot();
    let catalog = CatalogHealth {
        loaded: snapshot.is_loaded(),
        passes: snapshot.len(),
    };

    if catalog.loaded {
        (StatusCode::OK, Json(response("ok", Some(catalog))))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(response("degraded", Some(catalog))),
        )
    }
}

/// Liveness check - is the service alive?
async fn livez() -> impl IntoResponse {
    StatusCode::OK
}
