use reqwest::StatusCode;
use thiserror::Error;

/// Errors from object store operations.
#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid listing response: {0}")]
    Xml(#[from] quick_xml::DeError),

    #[error("request signing failed: {0}")]
    Signing(String),

    #[error("invalid endpoint URL '{0}'")]
    InvalidEndpoint(String),

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("object store returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("object too large: {size} bytes exceeds limit of {limit} bytes")]
    TooLarge { size: u64, limit: u64 },

    #[error("object store unavailable: {0}")]
    Unavailable(String),
}

impl ObjectStoreError {
    /// Returns true if the error means the key is absent, as opposed to the
    /// store failing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ObjectStoreError::NotFound(_))
    }
}
