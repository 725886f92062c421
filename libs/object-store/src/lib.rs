//! # wxviewer-object-store
//!
//! The remote byte store that holds pass images.
//!
//! The server only needs two operations from it:
//! - [`ObjectStore::list_common_prefixes`] to enumerate pass directories
//! - [`ObjectStore::get_object`] to fetch one image
//!
//! [`S3Client`] implements them against any S3-compatible endpoint using
//! path-style requests and Signature Version 4. With the `testing` feature,
//! `MemoryObjectStore` is an in-process implementation for tests.

mod error;
#[cfg(any(test, feature = "testing"))]
mod memory;
mod s3;
mod signing;

use async_trait::async_trait;
use bytes::Bytes;

pub use error::ObjectStoreError;
#[cfg(any(test, feature = "testing"))]
pub use memory::MemoryObjectStore;
pub use s3::{S3Client, S3Config};
pub use signing::Credentials;

/// Delimiter separating a pass directory from the files inside it.
pub const DELIMITER: &str = "/";

/// A remote key/value byte store with prefix listing.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Lists one page of distinct key prefixes up to and including
    /// `delimiter`, in ascending order, starting after `start_after`.
    ///
    /// Callers paginate by passing the last prefix of the previous page as
    /// `start_after` until a page comes back empty. Some stores repeat the
    /// `start_after` prefix itself at the head of the next page.
    async fn list_common_prefixes(
        &self,
        start_after: Option<&str>,
        delimiter: &str,
    ) -> Result<Vec<String>, ObjectStoreError>;

    /// Fetches the full contents of one object.
    ///
    /// Returns [`ObjectStoreError::NotFound`] if the key does not exist.
    async fn get_object(&self, key: &str) -> Result<Bytes, ObjectStoreError>;
}
