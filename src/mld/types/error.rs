//! Custom error types for the mld-reader crate.

use std::fmt;
use thiserror::Error;

/// The two chunk sections of an MLD container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Metadata,
    Tracks,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Section::Metadata => write!(f, "metadata"),
            Section::Tracks => write!(f, "track"),
        }
    }
}

/// The primary error type for all operations in this crate.
#[derive(Debug, Error)]
pub enum MldError {
    /// An error originating from I/O operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The buffer does not start with the `melo` marker.
    #[error("Invalid magic: expected \"melo\", found {found:02x?}")]
    InvalidMagic { found: Vec<u8> },

    /// A declared length reaches past the available bytes.
    #[error("Truncated {context}: need {needed} bytes, only {available} available")]
    Truncated {
        context: &'static str,
        needed: usize,
        available: usize,
    },

    /// A carving candidate declares a size above the configured limit.
    #[error("Candidate declares {size} bytes, above the {limit} byte limit")]
    OversizedCandidate { size: u64, limit: u64 },

    /// A chunk tag contains bytes other than lowercase ASCII letters.
    #[error("Invalid chunk tag {bytes:02x?} at offset {offset}")]
    InvalidTag { offset: usize, bytes: Vec<u8> },

    /// Chunk consumption did not land exactly on the section boundary.
    #[error("Misaligned {section} section: expected {expected} bytes, consumed {consumed}")]
    MisalignedSection {
        section: Section,
        expected: i64,
        consumed: i64,
    },

    /// A metadata tag has no known interpretation in strict rendering.
    #[error("Unrecognized metadata field '{tag}'")]
    UnrecognizedField { tag: String },

    /// The buffer has no `vers` tag to rewrite.
    #[error("No 'vers' field found")]
    MissingVersionField,

    /// The `vers` chunk does not hold the 4-byte payload a rewrite expects.
    #[error("'vers' field has size {found}, expected 4")]
    VersionFieldSize { found: usize },

    /// A mutex lock was poisoned, indicating a panic in another thread holding the lock.
    #[error("A mutex lock was poisoned, indicating a panic in another thread holding the lock.")]
    LockPoisoned,
}

impl MldError {
    /// Returns `true` for the errors that reject a candidate container
    /// (as opposed to I/O, rendering or editing failures).
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            MldError::InvalidMagic { .. }
                | MldError::Truncated { .. }
                | MldError::OversizedCandidate { .. }
                | MldError::InvalidTag { .. }
                | MldError::MisalignedSection { .. }
        )
    }
}

/// A convenience `Result` type alias using the crate's `MldError` type.
pub type Result<T> = std::result::Result<T, MldError>;
