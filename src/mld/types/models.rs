//! Core data structures for MLD container components.
//!
//! This module defines the decoded shape of a container:
//! - Chunk tags and raw chunks shared by both sections
//! - Track records, including the trailing-text fallback
//! - The header classification bytes and the assembled document

use std::fmt;
use indexmap::IndexMap;

use super::fields::MetadataFields;

/// A 4-byte chunk identifier made only of lowercase ASCII letters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkTag([u8; 4]);

impl ChunkTag {
    /// Builds a tag from raw bytes, returning `None` unless all four are `a..=z`.
    pub fn from_bytes(bytes: [u8; 4]) -> Option<Self> {
        is_tag_bytes(&bytes).then_some(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        // Only lowercase ASCII can be stored, which is always valid UTF-8.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl fmt::Display for ChunkTag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns `true` when every byte is a lowercase ASCII letter.
pub(crate) fn is_tag_bytes(bytes: &[u8]) -> bool {
    bytes.iter().all(u8::is_ascii_lowercase)
}

/// A single tagged, length-prefixed record.
///
/// `payload` is `None` when the declared size is zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub tag: ChunkTag,
    pub payload: Option<Vec<u8>>,
}

impl Chunk {
    /// Declared payload size in bytes.
    pub fn size(&self) -> usize {
        self.payload.as_ref().map_or(0, Vec::len)
    }
}

/// One record of the track section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackChunk {
    /// A regular tagged chunk. Tags may repeat across tracks.
    Chunk(Chunk),
    /// Trailing bytes that did not parse as a tagged chunk, decoded as text.
    UnknownText(String),
}

impl TrackChunk {
    pub fn tag(&self) -> Option<ChunkTag> {
        match self {
            TrackChunk::Chunk(chunk) => Some(chunk.tag),
            TrackChunk::UnknownText(_) => None,
        }
    }
}

/// Content classification stored at header offset 0x0A.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataTypeMajor {
    Ringtone,
    Music,
    Unknown(u8),
}

impl From<u8> for DataTypeMajor {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Ringtone,
            2 => Self::Music,
            other => Self::Unknown(other),
        }
    }
}

impl DataTypeMajor {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ringtone => "ringtone",
            Self::Music => "music",
            Self::Unknown(_) => "unknown",
        }
    }
}

/// Content sub-classification stored at header offset 0x0B.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataTypeMinor {
    Music,
    All,
    Part,
    Unknown(u8),
}

impl From<u8> for DataTypeMinor {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Music,
            1 => Self::All,
            2 => Self::Part,
            other => Self::Unknown(other),
        }
    }
}

impl DataTypeMinor {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Music => "music",
            Self::All => "all",
            Self::Part => "part",
            Self::Unknown(_) => "unknown",
        }
    }
}

/// A fully decoded MLD container.
///
/// Produced by [`decode`](crate::mld::decode); either every section parsed
/// or no document exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MldDocument {
    /// Declared container size (header field + 8).
    pub file_size: u64,
    pub data_type_major: u8,
    pub data_type_minor: u8,
    pub number_of_tracks: u8,
    /// Metadata chunks in file order. A repeated tag keeps its first position
    /// and takes the last payload.
    pub metadata_chunks: IndexMap<ChunkTag, Option<Vec<u8>>>,
    pub tracks: Vec<TrackChunk>,
}

impl MldDocument {
    pub fn major_type(&self) -> DataTypeMajor {
        DataTypeMajor::from(self.data_type_major)
    }

    pub fn minor_type(&self) -> DataTypeMinor {
        DataTypeMinor::from(self.data_type_minor)
    }

    /// Each track carries four chords.
    pub fn chord_count(&self) -> u32 {
        u32::from(self.number_of_tracks) * 4
    }

    /// Raw payload of a metadata chunk. `None` if the tag is missing or empty.
    pub fn metadata(&self, tag: &[u8; 4]) -> Option<&[u8]> {
        let tag = ChunkTag::from_bytes(*tag)?;
        self.metadata_chunks.get(&tag)?.as_deref()
    }

    /// Typed view over the metadata chunks.
    pub fn fields(&self) -> MetadataFields {
        MetadataFields::from_document(self)
    }
}
