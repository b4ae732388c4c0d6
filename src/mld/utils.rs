//! Low-level byte reading utilities

use byteorder::{BigEndian, ReadBytesExt};
use twox_hash::XxHash64;

use super::types::error::{MldError, Result};

/// Width of a big-endian integer field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberWidth {
    U8,
    U16,
    U32,
}

impl NumberWidth {
    pub fn bytes(&self) -> usize {
        match self {
            NumberWidth::U8 => 1,
            NumberWidth::U16 => 2,
            NumberWidth::U32 => 4,
        }
    }
}

/// Read a big-endian number and advance the reader.
///
/// Used for chunk size fields (2 bytes in the metadata section, 4 in the
/// track section) and the fixed header fields.
pub fn read_number(reader: &mut &[u8], width: NumberWidth, context: &'static str) -> Result<u32> {
    ensure_available(reader, width.bytes(), context)?;
    let value = match width {
        NumberWidth::U32 => reader.read_u32::<BigEndian>()?,
        NumberWidth::U16 => u32::from(reader.read_u16::<BigEndian>()?),
        NumberWidth::U8 => u32::from(reader.read_u8()?),
    };
    Ok(value)
}

/// Split `len` bytes off the front of the reader.
pub fn take<'a>(reader: &mut &'a [u8], len: usize, context: &'static str) -> Result<&'a [u8]> {
    ensure_available(reader, len, context)?;
    let (head, tail) = reader.split_at(len);
    *reader = tail;
    Ok(head)
}

/// Content hash used to spot byte-identical payloads.
pub fn content_hash(bytes: &[u8]) -> u64 {
    XxHash64::oneshot(0, bytes)
}

fn ensure_available(reader: &[u8], needed: usize, context: &'static str) -> Result<()> {
    if reader.len() < needed {
        return Err(MldError::Truncated {
            context,
            needed,
            available: reader.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_big_endian_widths() {
        let mut reader: &[u8] = &[0x01, 0x02, 0x00, 0x00, 0x01, 0x00, 0x07];
        assert_eq!(read_number(&mut reader, NumberWidth::U16, "test").unwrap(), 0x0102);
        assert_eq!(read_number(&mut reader, NumberWidth::U32, "test").unwrap(), 0x100);
        assert_eq!(read_number(&mut reader, NumberWidth::U8, "test").unwrap(), 7);
        assert!(reader.is_empty());
    }

    #[test]
    fn short_reads_are_truncated_errors() {
        let mut reader: &[u8] = &[0x01];
        let err = read_number(&mut reader, NumberWidth::U16, "size").unwrap_err();
        assert!(matches!(err, MldError::Truncated { needed: 2, available: 1, .. }));
        assert_eq!(reader.len(), 1);
        assert!(take(&mut reader, 2, "payload").is_err());
    }
}
