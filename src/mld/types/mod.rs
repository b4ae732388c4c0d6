//! Foundational data structures, error types, and field interpretation.

pub mod error;
pub mod fields;
pub mod models;
