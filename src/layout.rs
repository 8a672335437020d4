//! Size, alignment and padding arithmetic, plus the caller-record contract.
//!
//! Every structural boundary in a WRTF file is 8-byte aligned. The helpers
//! here are the single source of truth for that arithmetic — nothing else in
//! the crate computes padding or aligned sizes by hand.

use crate::error::{Result, WrtfError};
use crate::wire::MAGIC_SIZE;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// Rounds `n` up to the next multiple of 8.
///
/// `aligned_size(T) = ceil(size_of(T) / 8) * 8` from spec §4.1, generalized
/// to a raw byte count so it applies equally to records and to variable
/// length metadata payloads.
#[must_use]
pub const fn aligned_size(n: usize) -> usize {
    (n + 7) & !7
}

/// Number of zero padding bytes needed after `n` bytes to reach the next
/// 8-byte boundary. `padding(n) = (8 - n % 8) % 8`.
#[must_use]
pub const fn padding(n: usize) -> usize {
    aligned_size(n) - n
}

/// Returns `true` if `offset` is 8-byte aligned.
#[must_use]
pub const fn is_aligned(offset: u64) -> bool {
    offset % 8 == 0
}

/// A fixed-size, caller-supplied record type whose in-memory representation
/// is blittable: its on-wire image is exactly `SIZE` bytes and round-trips
/// through [`FixedRecord::read_from`] / [`FixedRecord::write_to`] without the
/// codec ever inspecting the record's internal fields.
///
/// This plays the role the source implementation fills with typed generics
/// over blittable structs (spec Design Notes §9): the codec only ever sees a
/// `SIZE` and a raw-byte view, so any fixed-layout record — including one
/// whose shape is only known at build time, generated from an external
/// schema — satisfies this trait.
pub trait FixedRecord: Sized {
    /// The exact number of bytes this record occupies on the wire, before
    /// alignment padding.
    const SIZE: usize;

    /// Decodes a record from exactly [`FixedRecord::SIZE`] bytes.
    ///
    /// Implementations may assume `bytes.len() >= Self::SIZE`; the codec
    /// guarantees this by construction (it never calls `read_from` with a
    /// short slice — see [`read_record`]).
    fn read_from(bytes: &[u8]) -> Result<Self>;

    /// Encodes this record into `out`, which is always exactly
    /// [`FixedRecord::SIZE`] bytes long.
    fn write_to(&self, out: &mut [u8]);
}

/// Reads one magic tag from `r` and compares it against `expected`.
///
/// `offset` is only used to produce a useful [`WrtfError::BadMagic`] — the
/// caller is responsible for having actually seeked there.
pub fn read_magic<R: Read>(r: &mut R, expected: [u8; MAGIC_SIZE], offset: u64) -> Result<()> {
    let mut found = [0u8; MAGIC_SIZE];
    r.read_exact(&mut found).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            WrtfError::UnexpectedEof
        } else {
            WrtfError::Io(e)
        }
    })?;
    if found != expected {
        return Err(WrtfError::BadMagic {
            expected,
            found,
            offset,
        });
    }
    Ok(())
}

/// Writes a magic tag to `w`.
pub fn write_magic<W: Write>(w: &mut W, magic: [u8; MAGIC_SIZE]) -> Result<()> {
    w.write_all(&magic)?;
    Ok(())
}

/// Writes `n` zero bytes to `w`. Used after every variable-length or
/// record-sized field to reach the next 8-byte boundary.
pub fn write_zero_padding<W: Write>(w: &mut W, n: usize) -> Result<()> {
    const ZEROS: [u8; 8] = [0u8; 8];
    debug_assert!(n <= ZEROS.len(), "padding is always < 8 bytes");
    w.write_all(&ZEROS[..n])?;
    Ok(())
}

/// Reads and discards `n` padding bytes from `r`.
pub fn skip_padding<R: Read>(r: &mut R, n: usize) -> Result<()> {
    let mut buf = [0u8; 8];
    debug_assert!(n <= buf.len(), "padding is always < 8 bytes");
    r.read_exact(&mut buf[..n]).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            WrtfError::UnexpectedEof
        } else {
            WrtfError::Io(e)
        }
    })?;
    Ok(())
}

/// Reads a [`FixedRecord`] plus its alignment padding from `r`.
///
/// This is the only place `T::read_from` is ever called with a slice
/// narrower than the buffer it was sliced from: the buffer is always
/// exactly `T::SIZE` bytes, satisfying the contract `FixedRecord` documents.
pub fn read_record<R: Read, T: FixedRecord>(r: &mut R) -> Result<T> {
    let mut buf = vec![0u8; T::SIZE];
    r.read_exact(&mut buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            WrtfError::UnexpectedEof
        } else {
            WrtfError::Io(e)
        }
    })?;
    let record = T::read_from(&buf)?;
    skip_padding(r, padding(T::SIZE))?;
    Ok(record)
}

/// Writes a [`FixedRecord`] plus its alignment padding to `w`.
pub fn write_record<W: Write, T: FixedRecord>(w: &mut W, record: &T) -> Result<()> {
    let mut buf = vec![0u8; T::SIZE];
    record.write_to(&mut buf);
    w.write_all(&buf)?;
    write_zero_padding(w, padding(T::SIZE))?;
    Ok(())
}

/// Reads a little-endian `u64`, mapping EOF to [`WrtfError::UnexpectedEof`].
pub fn read_u64<R: Read>(r: &mut R) -> Result<u64> {
    r.read_u64::<LittleEndian>().map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            WrtfError::UnexpectedEof
        } else {
            WrtfError::Io(e)
        }
    })
}

/// Reads a little-endian `u32`, mapping EOF to [`WrtfError::UnexpectedEof`].
pub fn read_u32<R: Read>(r: &mut R) -> Result<u32> {
    r.read_u32::<LittleEndian>().map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            WrtfError::UnexpectedEof
        } else {
            WrtfError::Io(e)
        }
    })
}

/// Writes a little-endian `u64`.
pub fn write_u64<W: Write>(w: &mut W, v: u64) -> Result<()> {
    w.write_u64::<LittleEndian>(v)?;
    Ok(())
}

/// Writes a little-endian `u32`.
pub fn write_u32<W: Write>(w: &mut W, v: u32) -> Result<()> {
    w.write_u32::<LittleEndian>(v)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aligned_size_rounds_up_to_next_multiple_of_8() {
        assert_eq!(aligned_size(0), 0);
        assert_eq!(aligned_size(1), 8);
        assert_eq!(aligned_size(7), 8);
        assert_eq!(aligned_size(8), 8);
        assert_eq!(aligned_size(9), 16);
        assert_eq!(aligned_size(63), 64);
        assert_eq!(aligned_size(64), 64);
    }

    #[test]
    fn padding_is_complement_of_aligned_size() {
        for n in 0..64 {
            assert_eq!(n + padding(n), aligned_size(n));
            assert!(padding(n) < 8);
        }
    }

    #[test]
    fn is_aligned_checks_multiples_of_8() {
        assert!(is_aligned(0));
        assert!(is_aligned(40));
        assert!(is_aligned(64));
        assert!(!is_aligned(1));
        assert!(!is_aligned(41));
    }

    #[test]
    fn magic_round_trips() {
        let mut buf = Vec::new();
        write_magic(&mut buf, *b"WRTF0001").unwrap();
        let mut cursor = std::io::Cursor::new(buf);
        read_magic(&mut cursor, *b"WRTF0001", 0).unwrap();
    }

    #[test]
    fn magic_mismatch_is_bad_magic() {
        let mut buf = Vec::new();
        write_magic(&mut buf, *b"WRSE0001").unwrap();
        let mut cursor = std::io::Cursor::new(buf);
        let err = read_magic(&mut cursor, *b"WRTF0001", 40).unwrap_err();
        match err {
            WrtfError::BadMagic {
                expected, offset, ..
            } => {
                assert_eq!(expected, *b"WRTF0001");
                assert_eq!(offset, 40);
            }
            other => panic!("expected BadMagic, got {other:?}"),
        }
    }

    struct TwoU32s {
        a: u32,
        b: u32,
    }

    impl FixedRecord for TwoU32s {
        const SIZE: usize = 8;

        fn read_from(bytes: &[u8]) -> Result<Self> {
            let mut cur = std::io::Cursor::new(bytes);
            Ok(Self {
                a: read_u32(&mut cur)?,
                b: read_u32(&mut cur)?,
            })
        }

        fn write_to(&self, out: &mut [u8]) {
            out[0..4].copy_from_slice(&self.a.to_le_bytes());
            out[4..8].copy_from_slice(&self.b.to_le_bytes());
        }
    }

    #[test]
    fn fixed_record_round_trips_through_read_write_record() {
        let mut buf = Vec::new();
        write_record(&mut buf, &TwoU32s { a: 7, b: 9 }).unwrap();
        assert_eq!(buf.len(), aligned_size(TwoU32s::SIZE));

        let mut cursor = std::io::Cursor::new(buf);
        let decoded: TwoU32s = read_record(&mut cursor).unwrap();
        assert_eq!(decoded.a, 7);
        assert_eq!(decoded.b, 9);
    }
}
