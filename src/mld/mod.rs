//! Core MLD container module.
//!
//! - [`format`]: Binary layout and the structural decoder
//! - [`types`]: Document model, typed fields and errors
//! - [`carve`]: Locating containers embedded in host files
//! - [`report`]: Human-readable metadata report
//! - [`edit`]: In-place `vers` rewrite
//! - [`export`]: Writing carved containers to disk

pub mod carve;
pub mod codec;
pub mod edit;
pub mod export;
pub mod format;
pub mod report;
pub mod types;
mod utils;

pub use format::document::decode;
pub use types::error::{MldError, Result};
