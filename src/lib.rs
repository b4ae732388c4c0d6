//! # mld-reader
//!
//! A reader for MLD (MFi ringtone/music) containers, the `melo` chunk format
//! used by Japanese feature phones.
//!
//! - Decodes and validates the header, metadata chunks and track chunks
//! - Interprets title, version, date, source and other metadata fields
//! - Carves containers embedded in arbitrary host files
//! - Rewrites the `vers` field in place
pub mod mld;

// Re-export the main types for convenience
pub use mld::{
    carve::{carve, dedup_by_content, CarvedMld, Carver, ScanMode, ScanOptions},
    decode,
    edit::{set_version, upgrade_to_mfi3, MFI3_VERSION},
    export::{ExportOptions, ExportOutcome, Exporter, ExtractSummary},
    report::{render, ReportOptions},
    types::{
        error::{MldError, Result, Section},
        fields::{DateField, MetadataFields, Origin, SourceInfo, VersionField},
        models::{Chunk, ChunkTag, DataTypeMajor, DataTypeMinor, MldDocument, TrackChunk},
    },
};
