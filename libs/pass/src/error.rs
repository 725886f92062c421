//! Error types for pass ID and image path parsing.

use thiserror::Error;

/// Errors that can occur when parsing a pass ID.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PassIdError {
    /// The ID string is empty.
    #[error("pass ID cannot be empty")]
    Empty,

    /// The ID does not have three dash-separated parts.
    #[error("pass ID must be '{{start}}-{{end}}-{{satellite}}', got '{0}'")]
    MissingPart(String),

    /// A timestamp part is not a plain digit string.
    #[error("invalid {field} timestamp '{value}'")]
    InvalidTimestamp { field: &'static str, value: String },
}

/// Reasons an image request path is rejected.
///
/// Every variant maps to a client error; none of them involve the object store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ImageKeyError {
    /// Path is not exactly `{dir}/{file}`.
    #[error("expected exactly two path segments, got {0}")]
    SegmentCount(usize),

    /// Directory segment is not a well-formed pass ID.
    #[error("invalid pass directory: {0}")]
    InvalidPass(#[from] PassIdError),

    /// Directory segment is well-formed but not a known pass.
    #[error("unknown pass '{0}'")]
    UnknownPass(String),

    /// File name does not start with `{dir}-`.
    #[error("file name must start with '{0}-'")]
    FilePrefix(String),

    /// Remainder is not exactly `{enhancement}.{extension}`.
    #[error("malformed file name suffix '{0}'")]
    MalformedSuffix(String),

    /// Extension is not the required one.
    #[error("unsupported extension '{0}'")]
    Extension(String),

    /// Enhancement is not on the allow-list.
    #[error("unknown enhancement '{0}'")]
    Enhancement(String),
}

impl ImageKeyError {
    /// Returns true if the path was syntactically valid but named a pass the
    /// catalog has not observed.
    pub fn is_unknown_pass(&self) -> bool {
        matches!(self, ImageKeyError::UnknownPass(_))
    }
}
