//! Tagged chunk decoding shared by the metadata and track sections.
//!
//! Both sections are a flat run of records:
//!
//! ```text
//! [4 bytes]   tag, lowercase ASCII letters only
//! [2|4 bytes] payload size (big-endian; 2 in metadata, 4 in tracks)
//! [N bytes]   payload, absent when the size is zero
//! ```
//!
//! The sections differ only in size-field width and in what happens when a
//! tag position holds something other than a tag, so one reader serves both,
//! driven by a [`ChunkLayout`].

use log::trace;

use crate::mld::codec::text;
use crate::mld::types::error::{MldError, Result, Section};
use crate::mld::types::models::{is_tag_bytes, Chunk, ChunkTag};
use crate::mld::utils;

pub use crate::mld::utils::NumberWidth;

const TAG_LEN: usize = 4;

/// What to do when a tag position does not hold four lowercase letters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidTagPolicy {
    /// Reject the section with [`MldError::InvalidTag`].
    Fail,
    /// Decode the rest of the span as text and stop.
    FallbackToText,
}

/// Per-section reading rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLayout {
    pub section: Section,
    pub size_width: NumberWidth,
    pub on_invalid_tag: InvalidTagPolicy,
}

impl ChunkLayout {
    pub const METADATA: ChunkLayout = ChunkLayout {
        section: Section::Metadata,
        size_width: NumberWidth::U16,
        on_invalid_tag: InvalidTagPolicy::Fail,
    };

    pub const TRACKS: ChunkLayout = ChunkLayout {
        section: Section::Tracks,
        size_width: NumberWidth::U32,
        on_invalid_tag: InvalidTagPolicy::FallbackToText,
    };

    /// Bytes taken by a chunk header (tag + size field).
    pub fn header_len(&self) -> usize {
        TAG_LEN + self.size_width.bytes()
    }
}

/// One decoded record of a section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Chunk(Chunk),
    /// Trailing bytes that were not a chunk, decoded as Shift_JIS.
    Text(String),
}

/// Reads every record in `span` and returns them with the number of bytes consumed.
///
/// `span` must already be cut to the section length. Every read is bounds
/// checked, so a record running past the end fails as [`MldError::Truncated`]
/// and a successful read always consumes the whole span. `base_offset` is the position of `span` inside the
/// container and only feeds error reporting.
pub fn read_chunks(span: &[u8], layout: &ChunkLayout, base_offset: usize) -> Result<(Vec<Record>, usize)> {
    let mut records = Vec::new();
    let mut reader = span;

    while !reader.is_empty() {
        let position = span.len() - reader.len();

        let candidate = &reader[..reader.len().min(TAG_LEN)];
        if !is_tag_bytes(candidate) {
            match layout.on_invalid_tag {
                InvalidTagPolicy::Fail => {
                    return Err(MldError::InvalidTag {
                        offset: base_offset + position,
                        bytes: candidate.to_vec(),
                    });
                }
                InvalidTagPolicy::FallbackToText => {
                    trace!(
                        "{} section: non-tag bytes at offset {}, reading {} trailing bytes as text",
                        layout.section,
                        base_offset + position,
                        reader.len()
                    );
                    records.push(Record::Text(text::decode_sjis(reader)));
                    break;
                }
            }
        }

        let tag_bytes = utils::take(&mut reader, TAG_LEN, "chunk tag")?;
        let tag = ChunkTag::from_bytes([tag_bytes[0], tag_bytes[1], tag_bytes[2], tag_bytes[3]])
            .ok_or_else(|| MldError::InvalidTag {
                offset: base_offset + position,
                bytes: tag_bytes.to_vec(),
            })?;
        let size = utils::read_number(&mut reader, layout.size_width, "chunk size")? as usize;
        let payload = match size {
            0 => None,
            _ => Some(utils::take(&mut reader, size, "chunk payload")?.to_vec()),
        };

        trace!(
            "{} chunk '{}' at offset {}: {} bytes",
            layout.section,
            tag,
            base_offset + position,
            size
        );
        records.push(Record::Chunk(Chunk { tag, payload }));
    }

    Ok((records, span.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(bytes: &[u8; 4]) -> ChunkTag {
        ChunkTag::from_bytes(*bytes).unwrap()
    }

    #[test]
    fn reads_metadata_chunks_in_order() {
        let span = b"titl\x00\x02Hivers\x00\x040300";
        let (records, consumed) = read_chunks(span, &ChunkLayout::METADATA, 13).unwrap();
        assert_eq!(consumed, span.len());
        assert_eq!(
            records,
            vec![
                Record::Chunk(Chunk { tag: tag(b"titl"), payload: Some(b"Hi".to_vec()) }),
                Record::Chunk(Chunk { tag: tag(b"vers"), payload: Some(b"0300".to_vec()) }),
            ]
        );
    }

    #[test]
    fn zero_size_means_absent_payload() {
        let (records, _) = read_chunks(b"note\x00\x00", &ChunkLayout::METADATA, 0).unwrap();
        assert_eq!(records, vec![Record::Chunk(Chunk { tag: tag(b"note"), payload: None })]);
    }

    #[test]
    fn metadata_rejects_bad_tag_with_offset() {
        let span = b"titl\x00\x01AtiTl\x00\x00";
        let err = read_chunks(span, &ChunkLayout::METADATA, 13).unwrap_err();
        match err {
            MldError::InvalidTag { offset, bytes } => {
                assert_eq!(offset, 13 + 7);
                assert_eq!(bytes, b"tiTl");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn payload_past_span_is_truncated() {
        let err = read_chunks(b"titl\x00\x05AB", &ChunkLayout::METADATA, 0).unwrap_err();
        assert!(matches!(err, MldError::Truncated { context: "chunk payload", needed: 5, available: 2 }));
    }

    #[test]
    fn short_size_field_is_truncated() {
        let err = read_chunks(b"trac\x00\x00", &ChunkLayout::TRACKS, 0).unwrap_err();
        assert!(matches!(err, MldError::Truncated { context: "chunk size", .. }));
    }

    #[test]
    fn track_section_uses_four_byte_sizes() {
        let span = b"trac\x00\x00\x00\x03abctrac\x00\x00\x00\x00";
        let (records, consumed) = read_chunks(span, &ChunkLayout::TRACKS, 0).unwrap();
        assert_eq!(consumed, span.len());
        assert_eq!(records.len(), 2);
        assert_eq!(records[1], Record::Chunk(Chunk { tag: tag(b"trac"), payload: None }));
    }

    #[test]
    fn track_section_falls_back_to_text() {
        let span = b"trac\x00\x00\x00\x01xTRAILER";
        let (records, consumed) = read_chunks(span, &ChunkLayout::TRACKS, 0).unwrap();
        assert_eq!(consumed, span.len());
        assert_eq!(records[1], Record::Text("TRAILER".into()));
    }

    #[test]
    fn short_lowercase_tail_is_truncated_in_tracks() {
        let err = read_chunks(b"ab", &ChunkLayout::TRACKS, 0).unwrap_err();
        assert!(matches!(err, MldError::Truncated { context: "chunk tag", .. }));
    }

    #[test]
    fn empty_span_has_no_records() {
        let (records, consumed) = read_chunks(&[], &ChunkLayout::TRACKS, 0).unwrap();
        assert!(records.is_empty());
        assert_eq!(consumed, 0);
    }
}
