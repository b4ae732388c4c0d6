//! Carving embedded MLD containers out of arbitrary host files.
//!
//! Every occurrence of the `melo` marker is a candidate. The candidate span is
//! bounded by the declared size read at that offset, then handed to the
//! decoder. Rejections are not fatal: the search resumes one byte after the
//! rejected marker, so overlapping and false-positive markers are all tried.
//!
//! # Example
//! ```no_run
//! # use mld_reader::{carve, ScanOptions};
//! let host = std::fs::read("dump.bin").unwrap();
//! for found in carve(&host, &ScanOptions::default()) {
//!     println!("{:#x}: {}", found.offset, found.title);
//! }
//! ```

use std::collections::HashSet;
use log::{debug, trace};
use memchr::memmem;

use crate::mld::format::document::{self, Header, MAGIC};
use crate::mld::codec::text;
use crate::mld::types::error::{MldError, Result};
use crate::mld::types::fields::tags;
use crate::mld::types::models::MldDocument;
use crate::mld::utils::{self, NumberWidth};

/// Size limit the batch extractor applies to candidates (3 MB).
pub const DEFAULT_MAX_CANDIDATE_SIZE: u64 = 3_000_000;

/// How thoroughly a candidate is checked before it is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanMode {
    /// Full structural decode.
    #[default]
    Strict,
    /// Header and metadata bounds only; the title comes from a raw `titl` search.
    TitleHeuristic,
}

/// Carving configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    pub mode: ScanMode,
    /// Candidates declaring more bytes than this are skipped. `None` disables the limit.
    pub max_candidate_size: Option<u64>,
    /// Cut spans that reach past the host buffer instead of rejecting them.
    pub clamp_to_buffer: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            mode: ScanMode::Strict,
            max_candidate_size: Some(DEFAULT_MAX_CANDIDATE_SIZE),
            clamp_to_buffer: false,
        }
    }
}

/// An accepted candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarvedMld {
    /// Offset of the `melo` marker in the host buffer.
    pub offset: usize,
    /// The candidate span, i.e. the standalone container.
    pub bytes: Vec<u8>,
    /// Decoded title, empty if the container has none.
    pub title: String,
    /// Full decode result; `None` in [`ScanMode::TitleHeuristic`].
    pub document: Option<MldDocument>,
}

/// One decode attempt at a marker occurrence.
#[derive(Debug)]
pub struct Candidate {
    pub offset: usize,
    pub outcome: Result<CarvedMld>,
}

/// Iterator over every marker occurrence in a host buffer.
///
/// Created by [`Carver::new`]; [`carve`] keeps only the accepted candidates.
pub struct Carver<'a> {
    buffer: &'a [u8],
    options: &'a ScanOptions,
    finder: memmem::Finder<'static>,
    position: usize,
}

impl<'a> Carver<'a> {
    pub fn new(buffer: &'a [u8], options: &'a ScanOptions) -> Self {
        Self {
            buffer,
            options,
            finder: memmem::Finder::new(MAGIC),
            position: 0,
        }
    }

    fn attempt(&self, offset: usize) -> Result<CarvedMld> {
        let rest = &self.buffer[offset..];
        let size = document::peek_file_size(rest).ok_or(MldError::Truncated {
            context: "declared size",
            needed: 8,
            available: rest.len(),
        })?;

        if let Some(limit) = self.options.max_candidate_size {
            if size > limit {
                return Err(MldError::OversizedCandidate { size, limit });
            }
        }

        let wanted = usize::try_from(size).unwrap_or(usize::MAX);
        let span_len = if wanted <= rest.len() {
            wanted
        } else if self.options.clamp_to_buffer {
            trace!("Clamping candidate at {:#x} from {} to {} bytes", offset, wanted, rest.len());
            rest.len()
        } else {
            return Err(MldError::Truncated {
                context: "candidate span",
                needed: wanted,
                available: rest.len(),
            });
        };
        let span = &rest[..span_len];

        let (title, document) = match self.options.mode {
            ScanMode::Strict => {
                let doc = document::decode(span)?;
                (doc.fields().title.unwrap_or_default(), Some(doc))
            }
            ScanMode::TitleHeuristic => {
                let header = Header::parse(span)?;
                let meta = &span[header.metadata_range(span.len())?];
                (find_title(meta).unwrap_or_default(), None)
            }
        };

        Ok(CarvedMld {
            offset,
            bytes: span.to_vec(),
            title,
            document,
        })
    }
}

impl Iterator for Carver<'_> {
    type Item = Candidate;

    fn next(&mut self) -> Option<Self::Item> {
        let found = self.finder.find(self.buffer.get(self.position..)?)?;
        let offset = self.position + found;
        // Advance by one byte, never past the failed span.
        self.position = offset + 1;

        let outcome = self.attempt(offset);
        match &outcome {
            Ok(carved) => debug!("Accepted MLD at {:#x} ({} bytes, title '{}')", offset, carved.bytes.len(), carved.title),
            Err(e) => debug!("Rejected candidate at {:#x}: {}", offset, e),
        }
        Some(Candidate { offset, outcome })
    }
}

/// Returns every candidate in `buffer` that passes the configured checks, in offset order.
pub fn carve(buffer: &[u8], options: &ScanOptions) -> Vec<CarvedMld> {
    Carver::new(buffer, options)
        .filter_map(|candidate| candidate.outcome.ok())
        .collect()
}

/// Keeps the first of every group of byte-identical containers.
pub fn dedup_by_content(carved: Vec<CarvedMld>) -> Vec<CarvedMld> {
    let mut seen = HashSet::new();
    carved
        .into_iter()
        .filter(|item| {
            let fresh = seen.insert(utils::content_hash(&item.bytes));
            if !fresh {
                debug!("Dropping duplicate MLD at {:#x}", item.offset);
            }
            fresh
        })
        .collect()
}

/// Raw search for a `titl` chunk inside a metadata span.
///
/// The payload is cut short rather than rejected when it runs past the span.
fn find_title(meta: &[u8]) -> Option<String> {
    let start = memmem::find(meta, &tags::TITLE)?;
    let mut reader = &meta[start + tags::TITLE.len()..];
    let size = utils::read_number(&mut reader, NumberWidth::U16, "title size").ok()? as usize;
    let payload = &reader[..size.min(reader.len())];
    Some(text::decode_sjis(payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container(title: &[u8]) -> Vec<u8> {
        let mut meta = b"titl".to_vec();
        meta.extend_from_slice(&(title.len() as u16).to_be_bytes());
        meta.extend_from_slice(title);
        let total = 13 + meta.len();
        let mut buf = b"melo".to_vec();
        buf.extend_from_slice(&(total as u32 - 8).to_be_bytes());
        buf.extend_from_slice(&(meta.len() as u16 + 3).to_be_bytes());
        buf.extend_from_slice(&[1, 0, 1]);
        buf.extend_from_slice(&meta);
        buf
    }

    #[test]
    fn finds_container_at_offset() {
        let mut host = vec![0u8; 100];
        let mld = container(b"Song");
        host[10..10 + mld.len()].copy_from_slice(&mld);

        let found = carve(&host, &ScanOptions::default());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].offset, 10);
        assert_eq!(found[0].title, "Song");
        assert_eq!(found[0].bytes, mld);
        assert!(found[0].document.is_some());
    }

    #[test]
    fn false_marker_does_not_hide_following_container() {
        let mut host = b"xxmelo\xff\xff\xff\xffjunk".to_vec();
        host.extend_from_slice(&container(b"B"));
        let attempts: Vec<Candidate> = Carver::new(&host, &ScanOptions::default()).collect();
        assert_eq!(attempts.len(), 2);
        assert!(matches!(attempts[0].outcome, Err(MldError::OversizedCandidate { .. })));
        assert_eq!(attempts[1].offset, 14);
        assert!(attempts[1].outcome.is_ok());
    }

    #[test]
    fn span_past_host_is_rejected_unless_clamped() {
        let mut host = container(b"T");
        host[0x07] += 4;
        assert!(carve(&host, &ScanOptions::default()).is_empty());

        let clamped = ScanOptions { clamp_to_buffer: true, ..ScanOptions::default() };
        let found = carve(&host, &clamped);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].bytes.len(), host.len());
    }

    #[test]
    fn heuristic_mode_skips_chunk_validation() {
        let mut host = container(b"Title");
        // Break the chunk tag; bounds still hold.
        host[13] = b'T';
        assert!(carve(&host, &ScanOptions::default()).is_empty());

        let heuristic = ScanOptions { mode: ScanMode::TitleHeuristic, ..ScanOptions::default() };
        let found = carve(&host, &heuristic);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "");
        assert!(found[0].document.is_none());
    }

    #[test]
    fn heuristic_title_uses_raw_search() {
        let heuristic = ScanOptions { mode: ScanMode::TitleHeuristic, ..ScanOptions::default() };
        let found = carve(&container(b"Raw"), &heuristic);
        assert_eq!(found[0].title, "Raw");
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let mld = container(b"Same");
        let mut host = mld.clone();
        host.extend_from_slice(b"pad");
        host.extend_from_slice(&mld);

        let found = carve(&host, &ScanOptions::default());
        assert_eq!(found.len(), 2);
        let unique = dedup_by_content(found);
        assert_eq!(unique.len(), 1);
        assert_eq!(unique[0].offset, 0);
    }
}
