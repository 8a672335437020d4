//! Metadata Codec (spec §4.3): a variable-length key/value dictionary that
//! follows the file header.
//!
//! Each entry is `{ u32 key_len, key, pad8, u32 val_len, val, pad8 }`, with
//! padding computed from the running byte position so every entry ends on
//! an 8-byte boundary measured from the start of the file.

use crate::error::{Result, WrtfError};
use crate::layout::{padding, read_u32, write_u32, write_zero_padding};
use crate::wire::FILE_HEADER_SIZE;
use std::io::{Read, Write};

/// An ordered key/value dictionary embedded in the file header.
///
/// Keys are unique and non-empty; insertion order is preserved across a
/// write/read round trip. Values may be empty. Both keys and values are
/// UTF-8 text with no length limit beyond what a `u32` length field allows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    entries: Vec<(String, String)>,
}

impl Metadata {
    /// An empty dictionary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `key -> value`, appending it in order.
    ///
    /// # Errors
    ///
    /// Fails with [`WrtfError::InvalidMetadata`] if `key` is empty or a key
    /// already present in the dictionary.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let key = key.into();
        if key.is_empty() {
            return Err(WrtfError::InvalidMetadata("empty key".to_string()));
        }
        if self.entries.iter().any(|(k, _)| k == &key) {
            return Err(WrtfError::DuplicateMetadataKey(key));
        }
        self.entries.push((key, value.into()));
        Ok(())
    }

    /// Number of entries in the dictionary.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if the dictionary has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up `key`, returning its value if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Encodes the dictionary's entries in order, each one 8-byte aligned
    /// relative to the cumulative position passed in `start_offset`
    /// (normally [`FILE_HEADER_SIZE`], i.e. `40`, since the dictionary
    /// always immediately follows the file header).
    pub fn write<W: Write>(&self, w: &mut W, start_offset: u64) -> Result<()> {
        let mut pos = start_offset;
        for (key, value) in &self.entries {
            let key_bytes = key.as_bytes();
            let val_bytes = value.as_bytes();

            write_u32(w, key_bytes.len() as u32)?;
            w.write_all(key_bytes)?;
            pos += 4 + key_bytes.len() as u64;
            let key_pad = padding(4 + key_bytes.len());
            write_zero_padding(w, key_pad)?;
            pos += key_pad as u64;

            write_u32(w, val_bytes.len() as u32)?;
            w.write_all(val_bytes)?;
            pos += 4 + val_bytes.len() as u64;
            let val_pad = padding(4 + val_bytes.len());
            write_zero_padding(w, val_pad)?;
            pos += val_pad as u64;
        }
        debug_assert_eq!(pos % 8, 0, "metadata block must end 8-aligned");
        Ok(())
    }

    /// Decodes `count` entries from `r`, which must be positioned at
    /// `start_offset` (normally `40`), out of a stream known to be
    /// `total_len` bytes long.
    ///
    /// Implements the spec's two-pass design: a first pass over the stream
    /// records each entry's `(key, value)` byte ranges are read directly (no
    /// separate size-then-fetch buffer is needed in a Rust implementation,
    /// since `Vec<u8>` already grows to fit whatever length is decoded) while
    /// tracking the running position so every entry's padding is computed
    /// the same way the writer computed it. `total_len` bounds every length
    /// field against the bytes actually remaining *before* an allocation is
    /// made for it, so a forged multi-gigabyte `key_len`/`val_len` in a tiny
    /// file is rejected as [`WrtfError::TruncatedBuffer`] instead of forcing
    /// a huge allocation ahead of the inevitable `UnexpectedEof`.
    ///
    /// # Errors
    ///
    /// Fails with [`WrtfError::TruncatedBuffer`] if a length field claims
    /// more bytes than remain in the stream, [`WrtfError::InvalidMetadata`]
    /// if the bytes are not valid UTF-8, or
    /// [`WrtfError::DuplicateMetadataKey`] if the stream names the same key
    /// twice.
    pub fn read<R: Read>(r: &mut R, count: u32, start_offset: u64, total_len: u64) -> Result<Self> {
        let mut entries = Vec::with_capacity(count as usize);
        let mut pos = start_offset;

        for _ in 0..count {
            let key_len = read_u32(r)? as usize;
            pos += 4;
            let key_bytes = read_exact_vec(r, key_len, pos, total_len)?;
            let key = String::from_utf8(key_bytes)
                .map_err(|e| WrtfError::InvalidMetadata(format!("key is not UTF-8: {e}")))?;
            pos += key_len as u64;
            let key_pad = padding(4 + key_len);
            skip_exact(r, key_pad)?;
            pos += key_pad as u64;

            let val_len = read_u32(r)? as usize;
            pos += 4;
            let val_bytes = read_exact_vec(r, val_len, pos, total_len)?;
            let value = String::from_utf8(val_bytes)
                .map_err(|e| WrtfError::InvalidMetadata(format!("value is not UTF-8: {e}")))?;
            pos += val_len as u64;
            let val_pad = padding(4 + val_len);
            skip_exact(r, val_pad)?;
            pos += val_pad as u64;

            if entries.iter().any(|(k, _): &(String, String)| k == &key) {
                return Err(WrtfError::DuplicateMetadataKey(key));
            }
            entries.push((key, value));
        }

        debug_assert_eq!(pos % 8, 0, "metadata block must end 8-aligned");
        Ok(Self { entries })
    }
}

/// Reads exactly `len` bytes from `r`, first checking that `len` does not
/// claim more bytes than remain between `pos_after_len_field` and
/// `total_len` — this guards against allocating `vec![0u8; len]` for a
/// forged length field before the stream has even been read.
fn read_exact_vec<R: Read>(
    r: &mut R,
    len: usize,
    pos_after_len_field: u64,
    total_len: u64,
) -> Result<Vec<u8>> {
    let available = total_len.saturating_sub(pos_after_len_field);
    if len as u64 > available {
        return Err(WrtfError::TruncatedBuffer {
            needed: len,
            available: available as usize,
        });
    }
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            WrtfError::UnexpectedEof
        } else {
            WrtfError::Io(e)
        }
    })?;
    Ok(buf)
}

fn skip_exact<R: Read>(r: &mut R, len: usize) -> Result<()> {
    let mut buf = [0u8; 8];
    debug_assert!(len <= buf.len());
    r.read_exact(&mut buf[..len]).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            WrtfError::UnexpectedEof
        } else {
            WrtfError::Io(e)
        }
    })
}

/// Size the metadata block occupies on the wire, in bytes, including
/// alignment padding. Useful for computing the session data's start offset
/// without actually writing anything.
#[must_use]
pub fn encoded_size(metadata: &Metadata) -> usize {
    let mut n = 0usize;
    for (key, value) in metadata.iter() {
        n += crate::layout::aligned_size(4 + key.len());
        n += crate::layout::aligned_size(4 + value.len());
    }
    n
}
