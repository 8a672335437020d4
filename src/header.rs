//! File Header (spec §3, §6): the fixed 40-byte preamble of a WRTF file.

use crate::error::{Result, WrtfError};
use crate::layout::{read_magic, read_u32, read_u64, write_magic, write_u32, write_u64};
use crate::wire::{FILE_MAGIC, FORMAT_VERSION};
use std::io::{Read, Write};

/// The fixed 40-byte file header, decoded.
///
/// Followed immediately on the wire by the metadata block (§4.3); this type
/// only covers `[0..40)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    /// File-format version. Always [`FORMAT_VERSION`] for a file this crate
    /// can read.
    pub version: u64,
    /// Sample rate in Hz. Always greater than zero.
    pub sample_rate: u64,
    /// Recording start time, in microseconds since the Unix epoch.
    pub start_timestamp_us: u64,
    /// Number of entries in the metadata dictionary that follows.
    pub metadata_count: u32,
}

impl FileHeader {
    /// Writes the header, in the layout `magic | version | sample_rate |
    /// start_timestamp_us | metadata_count | reserved(=0)`.
    pub fn write<W: Write>(&self, w: &mut W) -> Result<()> {
        write_magic(w, FILE_MAGIC)?;
        write_u64(w, self.version)?;
        write_u64(w, self.sample_rate)?;
        write_u64(w, self.start_timestamp_us)?;
        write_u32(w, self.metadata_count)?;
        write_u32(w, 0)?; // reserved
        Ok(())
    }

    /// Reads and validates the header.
    ///
    /// # Errors
    ///
    /// Fails with [`WrtfError::BadMagic`] if the leading 8 bytes are not
    /// `"WRTF0001"`, or [`WrtfError::UnsupportedVersion`] if `version != 1`.
    /// The reserved field is read and discarded.
    pub fn read<R: Read>(r: &mut R) -> Result<Self> {
        read_magic(r, FILE_MAGIC, 0)?;
        let version = read_u64(r)?;
        if version != FORMAT_VERSION {
            return Err(WrtfError::UnsupportedVersion(version));
        }
        let sample_rate = read_u64(r)?;
        let start_timestamp_us = read_u64(r)?;
        let metadata_count = read_u32(r)?;
        let _reserved = read_u32(r)?;
        Ok(Self {
            version,
            sample_rate,
            start_timestamp_us,
            metadata_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trips() {
        let header = FileHeader {
            version: 1,
            sample_rate: 60,
            start_timestamp_us: 1_700_000_000_000_000,
            metadata_count: 2,
        };
        let mut buf = Vec::new();
        header.write(&mut buf).unwrap();
        assert_eq!(buf.len(), crate::wire::FILE_HEADER_SIZE);

        let mut cursor = Cursor::new(buf);
        let decoded = FileHeader::read(&mut cursor).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut buf = vec![0u8; crate::wire::FILE_HEADER_SIZE];
        buf[0..8].copy_from_slice(b"NOPE0001");
        let mut cursor = Cursor::new(buf);
        assert!(matches!(
            FileHeader::read(&mut cursor),
            Err(WrtfError::BadMagic { .. })
        ));
    }

    #[test]
    fn rejects_unsupported_version() {
        let header = FileHeader {
            version: 2,
            sample_rate: 60,
            start_timestamp_us: 1,
            metadata_count: 0,
        };
        let mut buf = Vec::new();
        // Bypass the (nonexistent) version check on write — hand-encode.
        buf.extend_from_slice(&FILE_MAGIC);
        buf.extend_from_slice(&header.version.to_le_bytes());
        buf.extend_from_slice(&header.sample_rate.to_le_bytes());
        buf.extend_from_slice(&header.start_timestamp_us.to_le_bytes());
        buf.extend_from_slice(&header.metadata_count.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());

        let mut cursor = Cursor::new(buf);
        assert!(matches!(
            FileHeader::read(&mut cursor),
            Err(WrtfError::UnsupportedVersion(2))
        ));
    }
}
