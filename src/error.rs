//! Typed error taxonomy for WRTF reader/writer operations (spec §7).
//!
//! Every parse failure is surfaced at the boundary of a public operation; the
//! reader never attempts to heal a malformed file, and the writer never
//! retries internally.

use std::io;

/// Errors produced by [`crate::Writer`] and [`crate::Reader`] operations.
#[derive(Debug, thiserror::Error)]
pub enum WrtfError {
    /// A required 8-byte tag at a known offset did not match.
    #[error("bad magic: expected {expected:?}, found {found:?} at offset {offset}")]
    BadMagic {
        /// The magic that was expected at `offset`.
        expected: [u8; 8],
        /// The bytes actually found.
        found: [u8; 8],
        /// The absolute byte offset the magic was read from.
        offset: u64,
    },

    /// The file header's version field was not [`crate::wire::FORMAT_VERSION`].
    #[error("unsupported version: {0}")]
    UnsupportedVersion(u64),

    /// Insufficient bytes were available to complete a structural read.
    #[error("truncated buffer: needed {needed} bytes, had {available}")]
    TruncatedBuffer {
        /// Bytes required to decode the structure being read.
        needed: usize,
        /// Bytes actually available.
        available: usize,
    },

    /// The stream ended while more structural data was expected.
    #[error("unexpected end of stream")]
    UnexpectedEof,

    /// The stream's total length was not a multiple of 8, or a computed
    /// offset was not 8-aligned.
    #[error("misaligned stream: {0}")]
    MisalignedStream(String),

    /// A metadata entry had a negative/overflowing length field, non-UTF-8
    /// text, or reused an existing key.
    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),

    /// [`crate::Writer::new`] was called with a sample rate of zero.
    #[error("invalid sample rate: {0} (must be nonzero)")]
    InvalidSampleRate(u64),

    /// A metadata entry's key was already present in the dictionary.
    #[error("duplicate metadata key: {0:?}")]
    DuplicateMetadataKey(String),

    /// The document-footer's recorded frame count for a session disagreed
    /// with the frame count stored in that session's own footer.
    #[error(
        "inconsistent frame count for session at {session_offset}: document footer says {in_doc_footer}, session footer says {in_session_footer}"
    )]
    InconsistentFrameCount {
        /// Start offset of the session whose counts disagree.
        session_offset: u64,
        /// Frame count recorded in the document footer's index entry.
        in_doc_footer: u64,
        /// Frame count recorded in the session's own footer.
        in_session_footer: u64,
    },

    /// `footer_offset - data_offset` was not an exact multiple of the
    /// session's aligned total frame size.
    #[error(
        "corrupt session layout at {session_offset}: span {span} is not a multiple of frame size {frame_size}"
    )]
    CorruptSessionLayout {
        /// Start offset of the malformed session.
        session_offset: u64,
        /// `footer_offset - data_offset` for the session.
        span: u64,
        /// The aligned total frame size the span should be a multiple of.
        frame_size: u64,
    },

    /// The writer observed a frame tick lower than the session's current
    /// tick.
    #[error("tick order violation: got {got}, current tick is {current}")]
    TickOrderViolation {
        /// The rejected tick.
        got: u64,
        /// The session's tick before this call.
        current: u64,
    },

    /// [`crate::Writer::begin_session`] was called while a session was
    /// already open.
    #[error("a session is already open")]
    SessionAlreadyOpen,

    /// [`crate::Writer::write_frame`] or [`crate::Writer::end_session`] was
    /// called with no session open.
    #[error("no session is open")]
    NoSessionOpen,

    /// A public operation was called after the writer was closed.
    #[error("writer is closed")]
    WriterClosed,

    /// The underlying stream reported an I/O failure.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Convenience alias for the crate's fallible operations.
pub type Result<T> = std::result::Result<T, WrtfError>;
