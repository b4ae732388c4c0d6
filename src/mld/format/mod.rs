//! Binary layout of MLD containers.
//!
//! - [`chunk`]: Tagged record reader shared by both sections
//! - [`document`]: Fixed header, section slicing and document assembly

pub mod chunk;
pub mod document;
