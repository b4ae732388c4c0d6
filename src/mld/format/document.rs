//! MLD container header parsing and document assembly.
//!
//! # Container Structure
//! ```text
//! 0x00 [4 bytes] magic "melo"
//! 0x04 [4 bytes] declared size (total container size - 8)
//! 0x08 [2 bytes] metadata section size + 3
//! 0x0A [1 byte]  data type (major)
//! 0x0B [1 byte]  data type (minor)
//! 0x0C [1 byte]  number of tracks
//! 0x0D [N bytes] metadata chunks (tag + u16 size + payload)
//!      [...]     track chunks (tag + u32 size + payload) or trailing text
//! ```
//!
//! All integers are big-endian.

use byteorder::{BigEndian, ByteOrder};
use indexmap::IndexMap;
use log::{debug, trace};

use super::chunk::{self, ChunkLayout, Record};
use crate::mld::types::error::{MldError, Result, Section};
use crate::mld::types::models::{MldDocument, TrackChunk};

/// Marker every container starts with.
pub const MAGIC: &[u8; 4] = b"melo";

/// Fixed header length; the metadata section starts right after it.
pub const HEADER_LEN: usize = 0x0D;

/// The metadata size field counts three header bytes (type and track count).
const META_SIZE_BIAS: i64 = 3;

/// The fixed-position header fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Raw field at 0x04.
    pub declared_size: u32,
    /// Raw field at 0x08.
    pub meta_size_field: u16,
    pub data_type_major: u8,
    pub data_type_minor: u8,
    pub number_of_tracks: u8,
}

impl Header {
    /// Parses the 13-byte header after checking the magic marker.
    pub fn parse(buffer: &[u8]) -> Result<Self> {
        if !buffer.starts_with(MAGIC) {
            return Err(MldError::InvalidMagic {
                found: buffer[..buffer.len().min(MAGIC.len())].to_vec(),
            });
        }
        if buffer.len() < HEADER_LEN {
            return Err(MldError::Truncated {
                context: "header",
                needed: HEADER_LEN,
                available: buffer.len(),
            });
        }
        Ok(Self {
            declared_size: BigEndian::read_u32(&buffer[0x04..0x08]),
            meta_size_field: BigEndian::read_u16(&buffer[0x08..0x0A]),
            data_type_major: buffer[0x0A],
            data_type_minor: buffer[0x0B],
            number_of_tracks: buffer[0x0C],
        })
    }

    /// Total container size the header claims.
    pub fn file_size(&self) -> u64 {
        u64::from(self.declared_size) + 8
    }

    /// Metadata section size in bytes; negative for corrupt headers.
    pub fn data_info_size(&self) -> i64 {
        i64::from(self.meta_size_field) - META_SIZE_BIAS
    }

    /// Byte range of the metadata section, checked against `buffer_len`.
    pub fn metadata_range(&self, buffer_len: usize) -> Result<std::ops::Range<usize>> {
        let size = usize::try_from(self.data_info_size()).map_err(|_| MldError::MisalignedSection {
            section: Section::Metadata,
            expected: self.data_info_size(),
            consumed: 0,
        })?;
        let end = HEADER_LEN + size;
        if buffer_len < end {
            return Err(MldError::Truncated {
                context: "metadata section",
                needed: end,
                available: buffer_len,
            });
        }
        Ok(HEADER_LEN..end)
    }
}

/// Reads the declared container size at the start of `buffer` without any
/// other validation. `None` if fewer than 8 bytes are available.
pub fn peek_file_size(buffer: &[u8]) -> Option<u64> {
    buffer
        .get(0x04..0x08)
        .map(|field| u64::from(BigEndian::read_u32(field)) + 8)
}

/// Decodes one MLD container.
///
/// The track section runs to the end of `buffer`; callers carving from a
/// larger host buffer slice it to the candidate span first.
///
/// # Errors
/// - [`MldError::InvalidMagic`] if the buffer does not start with `melo`
/// - [`MldError::Truncated`] if the header, metadata section or a chunk
///   payload reaches past the available bytes
/// - [`MldError::InvalidTag`] for a malformed tag in the metadata section
/// - [`MldError::MisalignedSection`] if a section is not consumed exactly
pub fn decode(buffer: &[u8]) -> Result<MldDocument> {
    let header = Header::parse(buffer)?;
    trace!("MLD header: {:?}", header);

    let meta_range = header.metadata_range(buffer.len())?;
    let meta_end = meta_range.end;

    let (meta_records, _) = chunk::read_chunks(&buffer[meta_range], &ChunkLayout::METADATA, HEADER_LEN)?;
    let mut metadata_chunks = IndexMap::with_capacity(meta_records.len());
    for record in meta_records {
        if let Record::Chunk(chunk) = record {
            if metadata_chunks.insert(chunk.tag, chunk.payload).is_some() {
                debug!("Duplicate metadata tag '{}', keeping the last value", chunk.tag);
            }
        }
    }

    let (track_records, _) = chunk::read_chunks(&buffer[meta_end..], &ChunkLayout::TRACKS, meta_end)?;
    let tracks = track_records
        .into_iter()
        .map(|record| match record {
            Record::Chunk(chunk) => TrackChunk::Chunk(chunk),
            Record::Text(text) => TrackChunk::UnknownText(text),
        })
        .collect();

    Ok(MldDocument {
        file_size: header.file_size(),
        data_type_major: header.data_type_major,
        data_type_minor: header.data_type_minor,
        number_of_tracks: header.number_of_tracks,
        metadata_chunks,
        tracks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mld::types::models::{ChunkTag, DataTypeMajor, DataTypeMinor};

    fn minimal() -> Vec<u8> {
        let mut buf = b"melo".to_vec();
        buf.extend_from_slice(&12u32.to_be_bytes());
        buf.extend_from_slice(&10u16.to_be_bytes());
        buf.extend_from_slice(&[2, 1, 0]);
        buf.extend_from_slice(b"titl\x00\x01A");
        buf
    }

    #[test]
    fn decodes_minimal_container() {
        let buf = minimal();
        assert_eq!(buf.len(), 20);
        let doc = decode(&buf).unwrap();
        assert_eq!(doc.file_size, 20);
        assert_eq!(doc.major_type(), DataTypeMajor::Music);
        assert_eq!(doc.minor_type(), DataTypeMinor::All);
        assert_eq!(doc.number_of_tracks, 0);
        assert_eq!(doc.metadata(b"titl"), Some(&b"A"[..]));
        assert!(doc.tracks.is_empty());
    }

    #[test]
    fn rejects_wrong_or_short_magic() {
        assert!(matches!(decode(b"mel"), Err(MldError::InvalidMagic { .. })));
        assert!(matches!(decode(b"MELO\x00\x00\x00\x00"), Err(MldError::InvalidMagic { .. })));
    }

    #[test]
    fn short_header_is_truncated() {
        let buf = minimal();
        assert!(matches!(decode(&buf[..12]), Err(MldError::Truncated { context: "header", .. })));
    }

    #[test]
    fn metadata_past_buffer_is_truncated() {
        let mut buf = minimal();
        buf[0x09] = 0xFF;
        assert!(matches!(decode(&buf), Err(MldError::Truncated { context: "metadata section", .. })));
    }

    #[test]
    fn metadata_size_below_bias_is_misaligned() {
        let mut buf = minimal();
        buf[0x08] = 0;
        buf[0x09] = 1;
        match decode(&buf) {
            Err(MldError::MisalignedSection { section, expected, .. }) => {
                assert_eq!(section, Section::Metadata);
                assert_eq!(expected, -2);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn repeated_metadata_tag_keeps_first_position_last_value() {
        let mut buf = b"melo\x00\x00\x00\x00".to_vec();
        let meta = b"titl\x00\x01Avers\x00\x040300titl\x00\x01B";
        buf.extend_from_slice(&(meta.len() as u16 + 3).to_be_bytes());
        buf.extend_from_slice(&[1, 0, 1]);
        buf.extend_from_slice(meta);
        let doc = decode(&buf).unwrap();
        let tags: Vec<&str> = doc.metadata_chunks.keys().map(ChunkTag::as_str).collect();
        assert_eq!(tags, ["titl", "vers"]);
        assert_eq!(doc.metadata(b"titl"), Some(&b"B"[..]));
    }

    #[test]
    fn peeks_declared_size() {
        assert_eq!(peek_file_size(&minimal()), Some(20));
        assert_eq!(peek_file_size(b"melo\x00"), None);
    }
}
