//! Session framing (spec §3, §4.6): the session header/footer wire records
//! and the in-memory session descriptor the reader builds from them.

use crate::error::{Result, WrtfError};
use crate::layout::{aligned_size, read_record, read_u64, write_record, write_u64, FixedRecord};
use crate::wire::{SESSION_FOOTER_MAGIC, SESSION_HEADER_MAGIC};
use std::io::{Read, Write};

/// Writes a session header: magic, then the caller's header record aligned
/// to 8 bytes.
pub fn write_session_header<W: Write, H: FixedRecord>(w: &mut W, header: &H) -> Result<()> {
    crate::layout::write_magic(w, SESSION_HEADER_MAGIC)?;
    write_record(w, header)
}

/// Reads and validates a session header at the stream's current position.
///
/// `offset` is the absolute position the magic was read from, used only to
/// build a precise [`WrtfError::BadMagic`].
pub fn read_session_header<R: Read, H: FixedRecord>(r: &mut R, offset: u64) -> Result<H> {
    crate::layout::read_magic(r, SESSION_HEADER_MAGIC, offset)?;
    read_record(r)
}

/// Writes a session footer: magic, last tick, frame count, then the
/// caller's footer record aligned to 8 bytes.
///
/// The wire order — magic, then `last_tick`, then `frame_count`, then the
/// record — is normative (spec §9, open question (b)): this fixes the
/// revision where `last_tick` precedes `frame_count`.
pub fn write_session_footer<W: Write, F: FixedRecord>(
    w: &mut W,
    last_tick: u64,
    frame_count: u64,
    footer: &F,
) -> Result<()> {
    crate::layout::write_magic(w, SESSION_FOOTER_MAGIC)?;
    write_u64(w, last_tick)?;
    write_u64(w, frame_count)?;
    write_record(w, footer)
}

/// Reads and validates a session footer, returning `(last_tick, frame_count,
/// footer_record)`.
pub fn read_session_footer<R: Read, F: FixedRecord>(
    r: &mut R,
    offset: u64,
) -> Result<(u64, u64, F)> {
    crate::layout::read_magic(r, SESSION_FOOTER_MAGIC, offset)?;
    let last_tick = read_u64(r)?;
    let frame_count = read_u64(r)?;
    let record = read_record(r)?;
    Ok((last_tick, frame_count, record))
}

/// An immutable, fully-decoded description of one session, built by the
/// reader during [`crate::Reader::open`].
///
/// All offsets are absolute byte positions into the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescriptor<H, F> {
    /// Decoded session header record.
    pub header: H,
    /// Decoded session footer record.
    pub footer: F,
    /// Number of frames in the session.
    pub frame_count: u64,
    /// Tick of the last frame written, or 0 if the session has no frames.
    pub last_tick: u64,
    /// Absolute offset of the session header's magic (`"WRSE0001"`).
    pub start_offset: u64,
    /// Absolute offset of the first frame (`start_offset + 8 +
    /// aligned_size(H::SIZE)`).
    pub data_offset: u64,
    /// Absolute offset of the session footer's magic (`"WRSF0001"`).
    pub footer_offset: u64,
}

impl<H, F> SessionDescriptor<H, F> {
    /// `data_offset = start_offset + 8 (magic) + aligned_size(session header
    /// record)`, per spec §4.6.
    #[must_use]
    pub fn compute_data_offset(start_offset: u64, header_record_size: usize) -> u64 {
        start_offset + 8 + aligned_size(header_record_size) as u64
    }

    /// Validates `(footer_offset - data_offset) == frame_count *
    /// aligned_total_frame_size`, failing with
    /// [`WrtfError::CorruptSessionLayout`] otherwise.
    pub fn validate_span(&self, aligned_total_frame_size: u64) -> Result<()> {
        let span = self.footer_offset - self.data_offset;
        let expected = self.frame_count * aligned_total_frame_size;
        if span != expected {
            return Err(WrtfError::CorruptSessionLayout {
                session_offset: self.start_offset,
                span,
                frame_size: aligned_total_frame_size,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    struct SessionId(u32);

    impl FixedRecord for SessionId {
        const SIZE: usize = 4;

        fn read_from(bytes: &[u8]) -> Result<Self> {
            Ok(Self(u32::from_le_bytes(bytes[0..4].try_into().unwrap())))
        }

        fn write_to(&self, out: &mut [u8]) {
            out[0..4].copy_from_slice(&self.0.to_le_bytes());
        }
    }

    #[test]
    fn session_header_round_trips() {
        let mut buf = Vec::new();
        write_session_header(&mut buf, &SessionId(42)).unwrap();
        assert_eq!(buf.len() % 8, 0);

        let mut cursor = Cursor::new(buf);
        let decoded: SessionId = read_session_header(&mut cursor, 0).unwrap();
        assert_eq!(decoded.0, 42);
    }

    #[test]
    fn session_footer_round_trips_in_normative_order() {
        let mut buf = Vec::new();
        write_session_footer(&mut buf, 9, 3, &SessionId(7)).unwrap();

        // magic(8) | last_tick(8) | frame_count(8) | record(aligned)
        assert_eq!(&buf[0..8], b"WRSF0001");
        assert_eq!(u64::from_le_bytes(buf[8..16].try_into().unwrap()), 9);
        assert_eq!(u64::from_le_bytes(buf[16..24].try_into().unwrap()), 3);

        let mut cursor = Cursor::new(buf);
        let (last_tick, frame_count, record): (u64, u64, SessionId) =
            read_session_footer(&mut cursor, 0).unwrap();
        assert_eq!(last_tick, 9);
        assert_eq!(frame_count, 3);
        assert_eq!(record.0, 7);
    }

    #[test]
    fn data_offset_accounts_for_magic_and_aligned_header() {
        // header record of 4 bytes aligns to 8.
        let off = SessionDescriptor::<SessionId, SessionId>::compute_data_offset(100, 4);
        assert_eq!(off, 100 + 8 + 8);
    }

    #[test]
    fn validate_span_detects_corrupt_layout() {
        let desc = SessionDescriptor {
            header: SessionId(0),
            footer: SessionId(0),
            frame_count: 3,
            last_tick: 9,
            start_offset: 0,
            data_offset: 100,
            footer_offset: 100 + 3 * 16 + 1, // off by one byte
        };
        assert!(matches!(
            desc.validate_span(16),
            Err(WrtfError::CorruptSessionLayout { .. })
        ));
    }
}
