//! Human-readable metadata report.
//!
//! Renders one `key: value` line per present field, in a fixed order. In
//! strict mode a metadata tag without an interpretation fails the whole
//! report instead of being skipped.

use std::fmt::Write;

use crate::mld::codec::text;
use crate::mld::types::error::{MldError, Result};
use crate::mld::types::models::MldDocument;

/// Report configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    /// Fail with [`MldError::UnrecognizedField`] on unknown metadata tags.
    pub strict: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self { strict: true }
    }
}

/// Renders the full metadata report for a decoded document.
pub fn render(doc: &MldDocument, options: &ReportOptions) -> Result<String> {
    let fields = doc.fields();

    if options.strict {
        if let Some((tag, _)) = fields.unrecognized.first() {
            return Err(MldError::UnrecognizedField { tag: tag.to_string() });
        }
    }

    let mut out = String::new();
    let mut line = |key: &str, value: &dyn std::fmt::Display| {
        let _ = writeln!(out, "{}: {}", key, value);
    };

    if let Some(title) = &fields.title {
        line("title", title);
    }
    let major = doc.major_type();
    line("data_type_major", &format_args!("{} ({})", doc.data_type_major, major.label()));
    let minor = doc.minor_type();
    line("data_type_minor", &format_args!("{} ({})", doc.data_type_minor, minor.label()));
    line(
        "number_of_tracks",
        &format_args!("{} ({} chords)", doc.number_of_tracks, doc.chord_count()),
    );

    if let Some(source) = &fields.source {
        line("from", &format_args!("{} ({})", source.bits, source.origin.description()));
        line("isProtected", &source.protected);
    }
    if let Some(version) = &fields.version {
        line("MFi Version", version);
    }
    if let Some(date) = &fields.date {
        line("date", date);
    }
    if let Some(copyright) = &fields.copyright {
        line("copyright", copyright);
    }
    if let Some(generator) = &fields.generator {
        line("plugin", generator);
    }
    if let Some(provider) = &fields.provider {
        line("provider", &text::escape_bytes(provider));
    }
    if let Some(note) = &fields.note_length {
        line("note", note);
    }
    if let Some(exst) = &fields.extended_status_length {
        line("exst", exst);
    }
    if let Some(author) = &fields.author {
        line("author", &text::escape_bytes(author));
    }
    if let Some(ainf) = &fields.ainf {
        line("ainf", &text::escape_bytes(ainf));
    }
    if let Some(thrd) = &fields.thrd {
        line("thrd", &text::escape_bytes(thrd));
    }
    if let Some(cuep) = &fields.cue_point {
        line("cuep", &text::escape_bytes(cuep));
    }

    for (tag, payload) in &fields.unrecognized {
        let value = payload.as_deref().map(text::escape_bytes).unwrap_or_default();
        line(&format!("unknown {}", tag), &value);
    }

    Ok(out)
}
