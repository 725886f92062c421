//! # wxviewer-pass
//!
//! Identifier and request-path types for the wxviewer image server.
//!
//! ## Pass IDs
//!
//! A pass is one observation window of a weather satellite. Its identifier is
//! the object-store prefix that holds its images, encoded as
//! `{start}-{end}-{satellite}`:
//!
//! - `20230101000000-20230101001500-NOAA19`
//! - `20230312183012-20230312184401-METEOR-M2`
//!
//! Timestamps are fixed-width `YYYYMMDDhhmmss`, so the encoded form sorts
//! chronologically.
//!
//! ## Image paths
//!
//! Each pass directory holds one file per enhancement:
//! `{pass}/{pass}-{enhancement}.webp`. [`ImageKey::parse_path`] performs the
//! syntactic half of request validation; pass membership is checked by the
//! catalog that owns the set of known passes.

mod enhancement;
mod error;
mod image;
mod macros;
mod pass;

pub use enhancement::Enhancement;
pub use error::{ImageKeyError, PassIdError};
pub use image::{ImageKey, IMAGE_CONTENT_TYPE, IMAGE_EXTENSION};
pub use pass::PassId;
