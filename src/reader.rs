//! Reader (spec §4.5): a stateful random-access consumer over a readable,
//! seekable byte source.

use std::io::{Read, Seek, SeekFrom};
use std::marker::PhantomData;

use crate::error::{Result, WrtfError};
use crate::header::FileHeader;
use crate::layout::{aligned_size, read_magic, read_u64, FixedRecord};
use crate::metadata::Metadata;
use crate::session::{self, SessionDescriptor};
use crate::wire::{
    DOC_FOOTER_END_MAGIC, DOC_FOOTER_ENTRY_SIZE, DOC_FOOTER_START_MAGIC, FILE_HEADER_SIZE,
    FRAME_HEADER_SIZE,
};

/// A stateful random-access consumer of a WRTF v1 file.
///
/// Generic over the stream type `R` and the three caller-supplied record
/// types, matching [`crate::Writer`]. On [`Reader::open`], the header,
/// metadata, and every session's header and footer are eagerly validated
/// and decoded; frames are produced lazily on traversal via
/// [`Reader::frames`].
pub struct Reader<R: Read + Seek, H: FixedRecord, F: FixedRecord, P: FixedRecord> {
    stream: R,
    header: FileHeader,
    metadata: Metadata,
    sessions: Vec<SessionDescriptor<H, F>>,
    _marker: PhantomData<P>,
}

impl<R: Read + Seek, H: FixedRecord, F: FixedRecord, P: FixedRecord> Reader<R, H, F, P> {
    /// Aligned total size of one frame: the 8-byte tick header plus the
    /// payload record, rounded up to 8 bytes.
    fn aligned_frame_size() -> u64 {
        aligned_size(FRAME_HEADER_SIZE + P::SIZE) as u64
    }

    /// Opens `stream`, validating the file header, decoding metadata,
    /// locating the document footer from the end of the stream, and
    /// validating every session's header and footer.
    ///
    /// # Errors
    ///
    /// See spec §7 for the full taxonomy. In particular:
    /// - [`WrtfError::MisalignedStream`] if the stream length is not a
    ///   multiple of 8.
    /// - [`WrtfError::BadMagic`] if the file header, a session header/footer,
    ///   or either document-footer magic does not match.
    /// - [`WrtfError::UnsupportedVersion`] if the file header's version is
    ///   not 1.
    /// - [`WrtfError::InconsistentFrameCount`] if a session footer's frame
    ///   count disagrees with the document-footer's index entry.
    /// - [`WrtfError::CorruptSessionLayout`] if a session's data span isn't
    ///   an exact multiple of the aligned frame size.
    pub fn open(mut stream: R) -> Result<Self> {
        let total_len = stream.seek(SeekFrom::End(0))?;
        if total_len % 8 != 0 {
            return Err(WrtfError::MisalignedStream(format!(
                "stream length {total_len} is not a multiple of 8"
            )));
        }

        stream.seek(SeekFrom::Start(0))?;
        let header = FileHeader::read(&mut stream)?;
        let metadata = Metadata::read(
            &mut stream,
            header.metadata_count,
            FILE_HEADER_SIZE as u64,
            total_len,
        )?;

        let (session_entries, _doc_footer_start) = Self::locate_document_footer(&mut stream, total_len)?;

        let mut sessions = Vec::with_capacity(session_entries.len());
        for entry in session_entries {
            sessions.push(Self::load_session(&mut stream, entry)?);
        }

        Ok(Self {
            stream,
            header,
            metadata,
            sessions,
            _marker: PhantomData,
        })
    }

    /// Implements the reverse-seek discovery algorithm from spec §4.5:
    /// 1. `end - 8` must be `WRDE0001`.
    /// 2. `end - 16` holds the session count `N` (u64).
    /// 3. `end - 16 - N*24 - 8` must be `WRDF0001`.
    /// 4. The `N` entries between the start and end magics are the session
    ///    index.
    fn locate_document_footer(
        stream: &mut R,
        total_len: u64,
    ) -> Result<(Vec<(u64, u64, u64)>, u64)> {
        if total_len < 8 {
            return Err(WrtfError::UnexpectedEof);
        }
        stream.seek(SeekFrom::End(-8))?;
        read_magic(stream, DOC_FOOTER_END_MAGIC, total_len - 8)?;

        if total_len < 16 {
            return Err(WrtfError::UnexpectedEof);
        }
        stream.seek(SeekFrom::End(-16))?;
        let session_count = read_u64(stream)?;

        let entries_len = session_count
            .checked_mul(DOC_FOOTER_ENTRY_SIZE as u64)
            .ok_or_else(|| {
                WrtfError::MisalignedStream(format!(
                    "session count {session_count} overflows the document-footer index size"
                ))
            })?;
        let fixed_tail = 16u64
            .checked_add(entries_len)
            .and_then(|n| n.checked_add(8))
            .ok_or_else(|| {
                WrtfError::MisalignedStream(format!(
                    "session count {session_count} overflows the document-footer index size"
                ))
            })?;
        let doc_footer_start = total_len
            .checked_sub(fixed_tail)
            .ok_or(WrtfError::UnexpectedEof)?;

        stream.seek(SeekFrom::Start(doc_footer_start))?;
        read_magic(stream, DOC_FOOTER_START_MAGIC, doc_footer_start)?;

        let mut entries = Vec::with_capacity(session_count as usize);
        for _ in 0..session_count {
            let session_offset = read_u64(stream)?;
            let footer_offset = read_u64(stream)?;
            let frame_count = read_u64(stream)?;
            entries.push((session_offset, footer_offset, frame_count));
        }

        Ok((entries, doc_footer_start))
    }

    fn load_session(
        stream: &mut R,
        (session_offset, footer_offset, doc_frame_count): (u64, u64, u64),
    ) -> Result<SessionDescriptor<H, F>> {
        stream.seek(SeekFrom::Start(session_offset))?;
        let header: H = session::read_session_header(stream, session_offset)?;

        let data_offset = SessionDescriptor::<H, F>::compute_data_offset(session_offset, H::SIZE);

        stream.seek(SeekFrom::Start(footer_offset))?;
        let (last_tick, footer_frame_count, footer): (u64, u64, F) =
            session::read_session_footer(stream, footer_offset)?;

        if footer_frame_count != doc_frame_count {
            return Err(WrtfError::InconsistentFrameCount {
                session_offset,
                in_doc_footer: doc_frame_count,
                in_session_footer: footer_frame_count,
            });
        }

        let descriptor = SessionDescriptor {
            header,
            footer,
            frame_count: footer_frame_count,
            last_tick,
            start_offset: session_offset,
            data_offset,
            footer_offset,
        };
        descriptor.validate_span(Self::aligned_frame_size())?;

        Ok(descriptor)
    }

    /// The decoded file header.
    #[must_use]
    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    /// The decoded metadata dictionary.
    #[must_use]
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// The ordered list of session descriptors, in chronological write
    /// order (spec §5).
    #[must_use]
    pub fn sessions(&self) -> &[SessionDescriptor<H, F>] {
        &self.sessions
    }

    /// Returns a lazy, restartable, finite iterator over the `(tick,
    /// payload)` pairs of `session`.
    ///
    /// Iteration mutates the reader's stream position and is therefore not
    /// concurrent-safe on a single `Reader` (spec §4.5, §5) — the returned
    /// iterator borrows `self` mutably for exactly that reason.
    pub fn frames<'a>(&'a mut self, session: &SessionDescriptor<H, F>) -> Result<Frames<'a, R, P>> {
        self.stream.seek(SeekFrom::Start(session.data_offset))?;
        Ok(Frames {
            stream: &mut self.stream,
            remaining: session.frame_count,
            limit_offset: session.footer_offset,
            frame_size: Self::aligned_frame_size(),
            _marker: PhantomData,
        })
    }
}

/// A lazy, restartable, finite sequence of `(tick, payload)` pairs produced
/// by [`Reader::frames`].
///
/// Stops after exactly `frame_count` frames, or when the next read would
/// cross `footer_offset`, whichever comes first (spec §4.5).
pub struct Frames<'a, R, P> {
    stream: &'a mut R,
    remaining: u64,
    limit_offset: u64,
    frame_size: u64,
    _marker: PhantomData<P>,
}

impl<'a, R: Read + Seek, P: FixedRecord> Iterator for Frames<'a, R, P> {
    type Item = Result<(u64, P)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let current = match self.stream.stream_position() {
            Ok(pos) => pos,
            Err(e) => return Some(Err(WrtfError::Io(e))),
        };
        if current + self.frame_size > self.limit_offset {
            return None;
        }

        let tick = match read_u64(self.stream) {
            Ok(t) => t,
            Err(e) => return Some(Err(e)),
        };

        let mut buf = vec![0u8; P::SIZE];
        if let Err(e) = self.stream.read_exact(&mut buf) {
            return Some(Err(if e.kind() == std::io::ErrorKind::UnexpectedEof {
                WrtfError::UnexpectedEof
            } else {
                WrtfError::Io(e)
            }));
        }
        let payload = match P::read_from(&buf) {
            Ok(p) => p,
            Err(e) => return Some(Err(e)),
        };

        let padding = crate::layout::padding(FRAME_HEADER_SIZE + P::SIZE);
        if let Err(e) = self
            .stream
            .seek(SeekFrom::Current(padding as i64))
        {
            return Some(Err(WrtfError::Io(e)));
        }

        self.remaining -= 1;
        Some(Ok((tick, payload)))
    }
}
