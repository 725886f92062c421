//! HTTP API handlers and routing.

pub mod error;
mod health;
mod images;
mod list;
mod metrics;

use std::path::Path;

use axum::{
    extract::Request,
    http::{header, Method, Uri},
    middleware, Router,
};
use tower::ServiceExt;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::state::AppState;

/// Create the main router with all routes and middleware.
///
/// Requests that match no route are served from `static_dir`.
pub fn create_router(state: AppState, static_dir: &Path) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE])
        .allow_origin(Any);

    let frontend = ServeDir::new(static_dir).map_request(rewrite_frontend_path);

    Router::new()
        .merge(health::routes())
        .merge(list::routes())
        .merge(images::routes())
        .merge(metrics::routes())
        .fallback_service(frontend)
        // Middleware
        .layer(middleware::from_fn_with_state(
            state.clone(),
            metrics::track_requests,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Application state
        .with_state(state)
}

/// Deep links into the frontend start with a numeric segment (`/1672531200`
/// and so on); those load `index.html`.
fn rewrite_frontend_path(mut request: Request) -> Request {
    let numeric = request
        .uri()
        .path()
        .strip_prefix('/')
        .and_then(|rest| rest.split('/').next())
        .is_some_and(|first| first.parse::<i64>().is_ok());

    if numeric {
        *request.uri_mut() = Uri::from_static("/");
    }
    request
}
