//! wxviewer server library.
//!
//! This crate primarily ships a `wxviewer` binary, but we expose a library
//! surface to enable integration testing and reuse.

pub mod api;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod fetch;
pub mod images;
pub mod metrics;
pub mod refresh;
pub mod state;
pub mod validate;
