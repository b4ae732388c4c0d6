//! Typed interpretation of metadata chunks.
//!
//! The raw metadata mapping keeps every chunk verbatim. This module turns the
//! chunks with a known meaning into a fixed-shape [`MetadataFields`] value and
//! collects everything else in [`MetadataFields::unrecognized`].

use std::fmt;
use byteorder::{BigEndian, ByteOrder};
use chrono::NaiveDate;

use crate::mld::codec::text;
use super::models::{ChunkTag, MldDocument};

/// Well-known metadata tags.
pub mod tags {
    pub const TITLE: [u8; 4] = *b"titl";
    pub const SOURCE: [u8; 4] = *b"sorc";
    pub const VERSION: [u8; 4] = *b"vers";
    pub const DATE: [u8; 4] = *b"date";
    pub const COPYRIGHT: [u8; 4] = *b"copy";
    pub const NOTE: [u8; 4] = *b"note";
    pub const EXTENDED_STATUS: [u8; 4] = *b"exst";
    pub const GENERATOR: [u8; 4] = *b"supt";
    pub const PROVIDER: [u8; 4] = *b"prot";
    pub const AUTHOR: [u8; 4] = *b"auth";
    pub const AINF: [u8; 4] = *b"ainf";
    pub const THRD: [u8; 4] = *b"thrd";
    pub const CUE_POINT: [u8; 4] = *b"cuep";

    /// Every tag with an interpretation, in report order.
    pub const KNOWN: [[u8; 4]; 13] = [
        TITLE, SOURCE, VERSION, DATE, COPYRIGHT, GENERATOR, PROVIDER, NOTE,
        EXTENDED_STATUS, AUTHOR, AINF, THRD, CUE_POINT,
    ];

    pub fn is_known(tag: &[u8; 4]) -> bool {
        KNOWN.contains(tag)
    }
}

/// Where the content came from, taken from the upper 7 bits of `sorc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    NetworkDownload,
    TerminalInput,
    ExternalInterface,
    Unknown,
}

impl Origin {
    pub fn description(&self) -> &'static str {
        match self {
            Origin::NetworkDownload => "download from network",
            Origin::TerminalInput => "using terminal input function",
            Origin::ExternalInterface => "input using terminal external I/F",
            Origin::Unknown => "unknown",
        }
    }
}

/// Decoded `sorc` chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    /// The 7 origin bits, most significant first (e.g. `"0000001"`).
    pub bits: String,
    pub origin: Origin,
    /// Bit 7 of the bitstring, the protection flag.
    pub protected: bool,
}

impl SourceInfo {
    /// Interprets the payload as a bitstring; only its first byte carries meaning.
    pub fn parse(payload: &[u8]) -> Option<Self> {
        let first = *payload.first()?;
        let origin_bits = first >> 1;
        let origin = match origin_bits {
            0b000_0000 => Origin::NetworkDownload,
            0b000_0001 => Origin::TerminalInput,
            0b000_0010 => Origin::ExternalInterface,
            _ => Origin::Unknown,
        };
        Some(Self {
            bits: format!("{:07b}", origin_bits),
            origin,
            protected: first & 0x01 != 0,
        })
    }
}

/// Decoded `vers` chunk, e.g. `"0300"` for MFi 3.00.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionField {
    pub raw: String,
    /// `(integer, fraction)` when the first four bytes are ASCII digits.
    pub number: Option<(u8, u8)>,
}

impl VersionField {
    pub fn parse(payload: &[u8]) -> Self {
        let raw = text::decode_sjis(payload);
        let number = payload
            .get(..4)
            .filter(|digits| digits.iter().all(u8::is_ascii_digit))
            .map(|d| ((d[0] - b'0') * 10 + (d[1] - b'0'), (d[2] - b'0') * 10 + (d[3] - b'0')));
        Self { raw, number }
    }
}

impl fmt::Display for VersionField {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.number {
            Some((major, minor)) => write!(f, "{}.{:02}", major, minor),
            None => f.write_str(&self.raw),
        }
    }
}

/// Decoded `date` chunk. Falls back to the raw text when it is not `YYYYMMDD`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateField {
    Parsed(NaiveDate),
    Raw(String),
}

impl DateField {
    pub fn parse(payload: &[u8]) -> Self {
        match text::decode_ascii(payload) {
            Some(s) => NaiveDate::parse_from_str(s, "%Y%m%d")
                .map(DateField::Parsed)
                .unwrap_or_else(|_| DateField::Raw(s.to_owned())),
            None => DateField::Raw(text::escape_bytes(payload)),
        }
    }
}

impl fmt::Display for DateField {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DateField::Parsed(date) => write!(f, "{}", date.format("%Y/%m/%d")),
            DateField::Raw(raw) => f.write_str(raw),
        }
    }
}

/// A big-endian unsigned length field (`note`, `exst`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegerField {
    pub bytes: Vec<u8>,
}

impl IntegerField {
    /// `None` if the payload is wider than 8 bytes.
    pub fn value(&self) -> Option<u64> {
        match self.bytes.len() {
            1..=8 => Some(BigEndian::read_uint(&self.bytes, self.bytes.len())),
            _ => None,
        }
    }
}

impl fmt::Display for IntegerField {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.value() {
            Some(value) => write!(f, "{}", value),
            None => f.write_str(&text::escape_bytes(&self.bytes)),
        }
    }
}

/// Fixed-shape view of a document's metadata.
///
/// Chunks declared with size zero count as absent, except in `unrecognized`
/// which lists every unknown tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataFields {
    pub title: Option<String>,
    pub source: Option<SourceInfo>,
    pub version: Option<VersionField>,
    pub date: Option<DateField>,
    pub copyright: Option<String>,
    pub generator: Option<String>,
    pub note_length: Option<IntegerField>,
    pub extended_status_length: Option<IntegerField>,
    pub provider: Option<Vec<u8>>,
    pub author: Option<Vec<u8>>,
    pub ainf: Option<Vec<u8>>,
    pub thrd: Option<Vec<u8>>,
    pub cue_point: Option<Vec<u8>>,
    pub unrecognized: Vec<(ChunkTag, Option<Vec<u8>>)>,
}

impl MetadataFields {
    pub fn from_document(doc: &MldDocument) -> Self {
        let get = |tag: [u8; 4]| doc.metadata(&tag);
        let owned = |tag: [u8; 4]| get(tag).map(<[u8]>::to_vec);

        Self {
            title: get(tags::TITLE).map(text::decode_sjis),
            source: get(tags::SOURCE).and_then(SourceInfo::parse),
            version: get(tags::VERSION).map(VersionField::parse),
            date: get(tags::DATE).map(DateField::parse),
            copyright: get(tags::COPYRIGHT).map(text::decode_sjis),
            generator: get(tags::GENERATOR).map(text::decode_sjis),
            note_length: owned(tags::NOTE).map(|bytes| IntegerField { bytes }),
            extended_status_length: owned(tags::EXTENDED_STATUS).map(|bytes| IntegerField { bytes }),
            provider: owned(tags::PROVIDER),
            author: owned(tags::AUTHOR),
            ainf: owned(tags::AINF),
            thrd: owned(tags::THRD),
            cue_point: owned(tags::CUE_POINT),
            unrecognized: doc
                .metadata_chunks
                .iter()
                .filter(|(tag, _)| !tags::is_known(tag.as_bytes()))
                .map(|(tag, payload)| (*tag, payload.clone()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_bits_select_origin_and_protection() {
        let info = SourceInfo::parse(&[0b0000_0011]).unwrap();
        assert_eq!(info.bits, "0000001");
        assert_eq!(info.origin, Origin::TerminalInput);
        assert!(info.protected);

        let info = SourceInfo::parse(&[0b0000_0100]).unwrap();
        assert_eq!(info.origin, Origin::ExternalInterface);
        assert!(!info.protected);

        assert_eq!(SourceInfo::parse(&[0x00]).unwrap().origin, Origin::NetworkDownload);
        assert_eq!(SourceInfo::parse(&[0x80]).unwrap().origin, Origin::Unknown);
        assert_eq!(SourceInfo::parse(&[]), None);
    }

    #[test]
    fn version_formats_with_two_fraction_digits() {
        assert_eq!(VersionField::parse(b"0300").to_string(), "3.00");
        assert_eq!(VersionField::parse(b"0510").to_string(), "5.10");
        let odd = VersionField::parse(b"v3");
        assert_eq!(odd.number, None);
        assert_eq!(odd.to_string(), "v3");
    }

    #[test]
    fn date_falls_back_to_raw_text() {
        let date = DateField::parse(b"20040506");
        assert_eq!(date, DateField::Parsed(NaiveDate::from_ymd_opt(2004, 5, 6).unwrap()));
        assert_eq!(date.to_string(), "2004/05/06");
        assert_eq!(DateField::parse(b"20041345"), DateField::Raw("20041345".into()));
    }

    #[test]
    fn integer_fields_are_big_endian() {
        assert_eq!(IntegerField { bytes: vec![0x01, 0x02] }.value(), Some(258));
        assert_eq!(IntegerField { bytes: vec![0; 9] }.value(), None);
    }
}
