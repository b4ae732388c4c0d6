//! Text decoding for chunk payloads.
//!
//! Handsets wrote titles, copyright notices and trailing track text in
//! Shift_JIS. `encoding_rs::SHIFT_JIS` is the WHATWG variant, which is the
//! Windows code page 932 superset these files use in practice.

use std::borrow::Cow;
use encoding_rs::SHIFT_JIS;
use log::trace;

/// Decodes Shift_JIS bytes, silently dropping undecodable sequences.
pub fn decode_sjis(bytes: &[u8]) -> String {
    let (text, had_errors) = SHIFT_JIS.decode_without_bom_handling(bytes);
    if !had_errors {
        return text.into_owned();
    }
    trace!("Dropping undecodable Shift_JIS sequences from {} bytes", bytes.len());
    strip_replacement(text)
}

/// Decodes ASCII bytes strictly, returning `None` on any non-ASCII byte.
pub fn decode_ascii(bytes: &[u8]) -> Option<&str> {
    if bytes.is_ascii() {
        std::str::from_utf8(bytes).ok()
    } else {
        None
    }
}

/// Renders bytes the way a byte-string literal would show them:
/// printable ASCII verbatim, everything else as `\xNN`.
pub fn escape_bytes(bytes: &[u8]) -> String {
    bytes.escape_ascii().to_string()
}

fn strip_replacement(text: Cow<'_, str>) -> String {
    text.chars().filter(|&c| c != char::REPLACEMENT_CHARACTER).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_kana_and_kanji() {
        // "着メロ" in Shift_JIS
        let bytes = [0x92, 0x85, 0x83, 0x81, 0x83, 0x8D];
        assert_eq!(decode_sjis(&bytes), "着メロ");
    }

    #[test]
    fn drops_invalid_sequences() {
        // 0xA0 is unmapped, a lone lead byte at the end is incomplete
        let bytes = [b'A', 0xA0, b'B', 0x82];
        assert_eq!(decode_sjis(&bytes), "AB");
    }

    #[test]
    fn ascii_rejects_high_bytes() {
        assert_eq!(decode_ascii(b"20040506"), Some("20040506"));
        assert_eq!(decode_ascii(&[0x32, 0x90]), None);
    }

    #[test]
    fn escapes_like_byte_literals() {
        assert_eq!(escape_bytes(b"ab\x00\xff"), "ab\\x00\\xff");
    }
}
