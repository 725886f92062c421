use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::images::ImageError;

/// An error status with no body.
///
/// Image clients only look at the status, so nothing beyond it is sent. The
/// `code` names the failure for logs and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
}

impl ApiError {
    pub fn bad_request(code: &'static str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code,
        }
    }

    pub fn not_found(code: &'static str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code,
        }
    }

    pub fn internal(code: &'static str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code,
        }
    }

    pub fn bad_gateway(code: &'static str) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            code,
        }
    }

    pub fn service_unavailable(code: &'static str) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            code,
        }
    }

    pub fn gateway_timeout(code: &'static str) -> Self {
        Self {
            status: StatusCode::GATEWAY_TIMEOUT,
            code,
        }
    }
}

impl From<&ImageError> for ApiError {
    fn from(err: &ImageError) -> Self {
        match err {
            ImageError::Invalid(e) if e.is_unknown_pass() => ApiError::bad_request("unknown_pass"),
            ImageError::Invalid(_) => ApiError::bad_request("invalid_path"),
            ImageError::NotFound(_) => ApiError::not_found("image_not_found"),
            ImageError::Unavailable(_) => ApiError::bad_gateway("store_unavailable"),
            ImageError::Timeout(_) => ApiError::gateway_timeout("fetch_timeout"),
            ImageError::Abandoned => ApiError::service_unavailable("fetch_abandoned"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.status.into_response()
    }
}
