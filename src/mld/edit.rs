//! In-place edits of a raw container buffer.
//!
//! The only supported edit rewrites the 4-byte `vers` payload. The buffer must
//! decode cleanly first; the chunk is then located by a raw byte search.

use byteorder::{BigEndian, ByteOrder};
use log::info;
use memchr::memmem;

use crate::mld::format::document;
use crate::mld::types::error::{MldError, Result};
use crate::mld::types::fields::tags;

/// `vers` payload for MFi 3.00.
pub const MFI3_VERSION: [u8; 4] = *b"0300";

/// Overwrites the `vers` payload of the container in `buffer`.
///
/// Returns the offset of the rewritten payload.
///
/// # Errors
/// - Any structural error if `buffer` is not a valid container
/// - [`MldError::MissingVersionField`] if no `vers` tag is present
/// - [`MldError::VersionFieldSize`] if the located chunk does not declare 4 bytes
pub fn set_version(buffer: &mut [u8], version: [u8; 4]) -> Result<usize> {
    document::decode(buffer)?;

    let tag_offset = memmem::find(buffer, &tags::VERSION).ok_or(MldError::MissingVersionField)?;
    let size_offset = tag_offset + tags::VERSION.len();
    let payload_offset = size_offset + 2;
    let size_field = buffer
        .get(size_offset..payload_offset)
        .map(BigEndian::read_u16)
        .ok_or(MldError::Truncated {
            context: "version size",
            needed: payload_offset,
            available: buffer.len(),
        })?;
    if size_field != 4 {
        return Err(MldError::VersionFieldSize { found: usize::from(size_field) });
    }

    let available = buffer.len();
    let payload = buffer
        .get_mut(payload_offset..payload_offset + 4)
        .ok_or(MldError::Truncated {
            context: "version payload",
            needed: payload_offset + 4,
            available,
        })?;
    payload.copy_from_slice(&version);
    info!("Rewrote version field at offset {:#x}", payload_offset);
    Ok(payload_offset)
}

/// Marks the container as MFi 3.00.
pub fn upgrade_to_mfi3(buffer: &mut [u8]) -> Result<usize> {
    set_version(buffer, MFI3_VERSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(meta: &[u8]) -> Vec<u8> {
        let mut buf = b"melo".to_vec();
        buf.extend_from_slice(&((13 + meta.len()) as u32 - 8).to_be_bytes());
        buf.extend_from_slice(&(meta.len() as u16 + 3).to_be_bytes());
        buf.extend_from_slice(&[1, 0, 1]);
        buf.extend_from_slice(meta);
        buf
    }

    #[test]
    fn rewrites_version_payload() {
        let mut buf = build(b"titl\x00\x01Avers\x00\x040500");
        let offset = upgrade_to_mfi3(&mut buf).unwrap();
        assert_eq!(offset, 13 + 7 + 6);
        assert_eq!(&buf[offset..offset + 4], b"0300");
        let doc = document::decode(&buf).unwrap();
        assert_eq!(doc.metadata(b"vers"), Some(&b"0300"[..]));
    }

    #[test]
    fn refuses_without_version_tag() {
        let mut buf = build(b"titl\x00\x01A");
        assert!(matches!(upgrade_to_mfi3(&mut buf), Err(MldError::MissingVersionField)));
    }

    #[test]
    fn refuses_invalid_container_untouched() {
        let mut buf = build(b"vers\x00\x040500");
        buf[0] = b'M';
        let before = buf.clone();
        assert!(matches!(upgrade_to_mfi3(&mut buf), Err(MldError::InvalidMagic { .. })));
        assert_eq!(buf, before);
    }

    #[test]
    fn refuses_short_version_chunk() {
        let mut buf = build(b"vers\x00\x0205");
        assert!(matches!(upgrade_to_mfi3(&mut buf), Err(MldError::VersionFieldSize { found: 2 })));
    }
}
