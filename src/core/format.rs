//! Purpose: Centralize `@UTF` container constants and signature gating.
//! Exports: header sizes, storage/type nibble codes, `NULL_SENTINEL`, `detect_endian`, `align32`.
//! Role: Shared policy for every decode/encode/size path.
//! Invariants: The canonical magic is big-endian; the byte-swapped magic marks little-endian.
//! Invariants: Offsets in the table header are relative to `TABLE_BASE`.

use crate::core::cursor::Endian;
use crate::core::error::{Error, ErrorKind};

pub const MAGIC: [u8; 4] = *b"@UTF";
pub const MAGIC_SWAPPED: [u8; 4] = *b"FTU@";

/// Magic plus declared table size.
pub const CONTAINER_HEADER_LEN: usize = 8;
pub const TABLE_HEADER_LEN: usize = 24;
/// Every offset stored in the table header counts from here.
pub const TABLE_BASE: usize = CONTAINER_HEADER_LEN;
pub const COLUMNS_START: usize = TABLE_BASE + TABLE_HEADER_LEN;
/// Flags byte plus name offset.
pub const COLUMN_ENTRY_LEN: usize = 5;

pub const POOL_ALIGN: usize = 32;
pub const NULL_SENTINEL: &str = "<NULL>";
/// Row count limit for tables whose rows occupy no bytes.
pub const MAX_STRIDELESS_ROWS: usize = 1 << 16;

pub const STORAGE_MASK: u8 = 0xF0;
pub const STORAGE_ABSENT: u8 = 0x00;
pub const STORAGE_ZERO: u8 = 0x10;
pub const STORAGE_CONSTANT: u8 = 0x30;
pub const STORAGE_PER_ROW: u8 = 0x50;

pub const TYPE_MASK: u8 = 0x0F;
pub const TYPE_U8: u8 = 0x00;
pub const TYPE_U16: u8 = 0x02;
pub const TYPE_U32: u8 = 0x04;
pub const TYPE_U64: u8 = 0x06;
pub const TYPE_F32: u8 = 0x08;
pub const TYPE_STRING: u8 = 0x0A;
pub const TYPE_BLOB: u8 = 0x0B;
/// Integer codes with this bit set are the signed twins of the even code below them.
pub const TYPE_SIGNED_BIT: u8 = 0x01;

pub fn detect_endian(buf: &[u8]) -> Result<Endian, Error> {
    if buf.len() < CONTAINER_HEADER_LEN {
        return Err(Error::new(ErrorKind::Truncated)
            .with_message(format!(
                "container header needs {CONTAINER_HEADER_LEN} bytes, buffer has {}",
                buf.len()
            ))
            .with_offset(0));
    }
    match [buf[0], buf[1], buf[2], buf[3]] {
        MAGIC => Ok(Endian::Big),
        MAGIC_SWAPPED => Ok(Endian::Little),
        other => Err(Error::new(ErrorKind::BadSignature)
            .with_message(format!("bad container magic {other:02x?}"))
            .with_offset(0)
            .with_hint("Expected an @UTF table; archives must be unpacked before decoding.")),
    }
}

pub fn magic_for(endian: Endian) -> [u8; 4] {
    match endian {
        Endian::Big => MAGIC,
        Endian::Little => MAGIC_SWAPPED,
    }
}

pub fn align32(value: usize) -> usize {
    (value + (POOL_ALIGN - 1)) & !(POOL_ALIGN - 1)
}

#[cfg(test)]
mod tests {
    use super::{align32, detect_endian, magic_for};
    use crate::core::cursor::Endian;
    use crate::core::error::ErrorKind;

    #[test]
    fn alignment_is_32_bytes() {
        assert_eq!(align32(0), 0);
        assert_eq!(align32(1), 32);
        assert_eq!(align32(32), 32);
        assert_eq!(align32(33), 64);
        assert_eq!(align32(72), 96);
    }

    #[test]
    fn magic_selects_endianness() {
        let mut buf = [0u8; 8];
        buf[0..4].copy_from_slice(&magic_for(Endian::Big));
        assert_eq!(detect_endian(&buf).expect("big"), Endian::Big);
        buf[0..4].copy_from_slice(&magic_for(Endian::Little));
        assert_eq!(detect_endian(&buf).expect("little"), Endian::Little);
    }

    #[test]
    fn unknown_magic_is_rejected() {
        let err = detect_endian(b"CPK \0\0\0\0").expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::BadSignature);
    }

    #[test]
    fn short_buffer_is_truncated() {
        let err = detect_endian(b"@UT").expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::Truncated);
    }
}
