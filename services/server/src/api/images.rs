//! Image endpoint.

use axum::{
    extract::{Path, State},
    http::{
        header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE},
        HeaderValue,
    },
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tracing::debug;
use wxviewer_pass::IMAGE_CONTENT_TYPE;

use super::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    // The wildcard keeps malformed paths (wrong segment counts) in this
    // handler so they are answered with 400. The wildcard does not match an
    // empty tail, which gets its own route.
    Router::new()
        .route("/images/", get(missing_image_path))
        .route("/images/{*path}", get(get_image))
}

async fn missing_image_path() -> ApiError {
    ApiError::bad_request("invalid_path")
}

async fn get_image(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Response, ApiError> {
    let image = state.images().serve(&path).await.map_err(|e| {
        let err = ApiError::from(&e);
        debug!(path = %path, status = err.status.as_u16(), code = err.code, error = %e, "Image request failed");
        err
    })?;

    state.metrics().images_served.inc();

    let headers = [
        (CONTENT_TYPE, HeaderValue::from_static(IMAGE_CONTENT_TYPE)),
        (CONTENT_LENGTH, HeaderValue::from(image.payload.len())),
        (CACHE_CONTROL, HeaderValue::from_static("public")),
    ];
    Ok((headers, image.payload).into_response())
}
