//! Wire schema constants for the WRTF v1 container format.
//!
//! Every structural boundary in a WRTF file is introduced by one of these
//! five 8-byte ASCII magics. All of them are exactly [`MAGIC_SIZE`] bytes;
//! none of them ever appear anywhere else in a well-formed file.

/// Size in bytes of every magic tag in the format.
pub const MAGIC_SIZE: usize = 8;

/// Marks the start of the file: `"WRTF0001"`.
pub const FILE_MAGIC: [u8; MAGIC_SIZE] = *b"WRTF0001";

/// Marks the start of a session header: `"WRSE0001"`.
pub const SESSION_HEADER_MAGIC: [u8; MAGIC_SIZE] = *b"WRSE0001";

/// Marks the start of a session footer: `"WRSF0001"`.
pub const SESSION_FOOTER_MAGIC: [u8; MAGIC_SIZE] = *b"WRSF0001";

/// Marks the start of the document footer: `"WRDF0001"`.
pub const DOC_FOOTER_START_MAGIC: [u8; MAGIC_SIZE] = *b"WRDF0001";

/// Marks the very last bytes of the file: `"WRDE0001"`.
pub const DOC_FOOTER_END_MAGIC: [u8; MAGIC_SIZE] = *b"WRDE0001";

/// The only file-format version this crate understands.
pub const FORMAT_VERSION: u64 = 1;

/// Fixed size of the file header, magic through `reserved` (§3, §6): 40 bytes.
///
/// ```text
/// [0..8)   magic
/// [8..16)  version
/// [16..24) sample_rate
/// [24..32) start_timestamp_us
/// [32..36) metadata_count
/// [36..40) reserved
/// ```
pub const FILE_HEADER_SIZE: usize = 40;

/// Size of one entry in the document-footer session index: three `u64`s
/// (header offset, footer offset, frame count).
pub const DOC_FOOTER_ENTRY_SIZE: usize = 24;

/// Size of the document footer's fixed tail: start magic, session count,
/// end magic. Variable-length session-index entries sit between the start
/// magic and the count.
pub const DOC_FOOTER_FIXED_SIZE: usize = MAGIC_SIZE + 8 + MAGIC_SIZE;

/// Size of the 8-byte frame header (the tick counter) that precedes every
/// frame payload.
pub const FRAME_HEADER_SIZE: usize = 8;

/// Size of the fixed tail of a session footer, excluding the caller's
/// session-footer record: magic, last tick, frame count.
pub const SESSION_FOOTER_FIXED_SIZE: usize = MAGIC_SIZE + 8 + 8;
