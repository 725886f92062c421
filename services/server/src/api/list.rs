//! Pass listing endpoint.

use std::fmt::Write;

use axum::{extract::State, http::header, response::IntoResponse, routing::get, Router};
use tracing::warn;
use wxviewer_pass::Enhancement;

use crate::catalog::CatalogSnapshot;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/list", get(list_passes))
}

/// Lists every known pass, refreshing the catalog first if it is stale.
///
/// A failed refresh is not an error for the client: the last known passes
/// are returned.
async fn list_passes(State(state): State<AppState>) -> impl IntoResponse {
    if let Err(e) = state.catalog().refresh().await {
        state.metrics().catalog_refresh_failures.inc();
        warn!(error = %e, "Catalog refresh failed, serving last known passes");
    }

    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        render_pass_list(&state.catalog().snapshot()),
    )
}

/// One line per pass: `start end satellite` followed by every enhancement.
pub fn render_pass_list(snapshot: &CatalogSnapshot) -> String {
    let enhancements = Enhancement::joined();
    let mut body = String::new();
    for pass in snapshot.passes() {
        // Writing to a String cannot fail.
        let _ = writeln!(body, "{} {enhancements}", pass.descriptor());
    }
    body
}
