//! Writer (spec §4.4): a stateful streaming producer over a writable,
//! seekable byte sink.

use std::io::{Seek, Write};
use std::marker::PhantomData;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Result, WrtfError};
use crate::header::FileHeader;
use crate::layout::{aligned_size, write_u64, FixedRecord};
use crate::metadata::Metadata;
use crate::session;
use crate::wire::{DOC_FOOTER_END_MAGIC, DOC_FOOTER_START_MAGIC, FORMAT_VERSION, FRAME_HEADER_SIZE};

/// One entry in the writer's in-memory session index, mirroring the
/// document-footer entry it will eventually become.
#[derive(Debug, Clone, Copy)]
struct SessionIndexEntry {
    session_offset: u64,
    footer_offset: u64,
    frame_count: u64,
}

/// Writer state machine (spec §4.6): which operations are currently legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// No session has been opened yet; the file header may not exist on
    /// disk yet either.
    Fresh,
    /// A session is open; `write_frame`/`end_session` are legal.
    SessionOpen,
    /// Between sessions; `begin_session`/`close` are legal.
    Idle,
    /// The document footer has been emitted; every operation fails.
    Closed,
}

/// Per-session scratch state, reset on every `begin_session`.
struct OpenSession {
    offset: u64,
    current_tick: u64,
    frame_count: u64,
}

/// Stateful streaming producer of a WRTF v1 file.
///
/// Generic over the stream type `W` and the three caller-supplied record
/// types: `H` (session header), `F` (session footer), `P` (frame payload).
/// See [`crate::layout::FixedRecord`] for the contract those types satisfy.
/// `F` additionally requires [`Default`] so [`Writer::close`] (and the drop
/// path) can synthesize a zero-valued footer for a session left open.
///
/// The file header and metadata block are materialized lazily on the first
/// [`Writer::begin_session`] call, not on construction — spec §3's
/// lifecycle note and §4.6's state machine both require this.
pub struct Writer<W: Write + Seek, H: FixedRecord, F: FixedRecord + Default, P: FixedRecord> {
    stream: W,
    sample_rate: u64,
    metadata: Metadata,
    state: State,
    open_session: Option<OpenSession>,
    sessions: Vec<SessionIndexEntry>,
    header_written: bool,
    /// Reusable scratch buffer for frame writes, sized at
    /// `max(1024, aligned total frame size)` (spec §4.4).
    scratch: Vec<u8>,
    _marker: PhantomData<(H, F, P)>,
}

impl<W: Write + Seek, H: FixedRecord, F: FixedRecord + Default, P: FixedRecord> Writer<W, H, F, P> {
    /// Aligned total size of one frame: the 8-byte tick header plus the
    /// payload record, rounded up to 8 bytes.
    fn aligned_frame_size() -> usize {
        aligned_size(FRAME_HEADER_SIZE + P::SIZE)
    }

    /// Constructs a writer over `stream`. `sample_rate` must be nonzero.
    /// `metadata` defaults to empty if not given. No bytes are written by
    /// this call.
    ///
    /// # Errors
    ///
    /// Returns [`WrtfError::InvalidSampleRate`] if `sample_rate` is zero.
    pub fn new(stream: W, sample_rate: u64, metadata: Option<Metadata>) -> Result<Self> {
        if sample_rate == 0 {
            return Err(WrtfError::InvalidSampleRate(sample_rate));
        }
        let frame_size = Self::aligned_frame_size();
        Ok(Self {
            stream,
            sample_rate,
            metadata: metadata.unwrap_or_default(),
            state: State::Fresh,
            open_session: None,
            sessions: Vec::new(),
            header_written: false,
            scratch: Vec::with_capacity(frame_size.max(1024)),
            _marker: PhantomData,
        })
    }

    fn ensure_file_header_written(&mut self) -> Result<()> {
        if self.header_written {
            return Ok(());
        }
        let start_timestamp_us = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is before the Unix epoch")
            .as_micros() as u64;
        let header = FileHeader {
            version: FORMAT_VERSION,
            sample_rate: self.sample_rate,
            start_timestamp_us,
            metadata_count: self.metadata.len() as u32,
        };
        header.write(&mut self.stream)?;
        self.metadata
            .write(&mut self.stream, crate::wire::FILE_HEADER_SIZE as u64)?;
        self.header_written = true;
        Ok(())
    }

    /// Opens a new session, writing the file header and metadata first if
    /// this is the first session in the file.
    ///
    /// # Errors
    ///
    /// Fails with [`WrtfError::SessionAlreadyOpen`] if a session is already
    /// open, or [`WrtfError::WriterClosed`] if [`Writer::close`] was already
    /// called.
    pub fn begin_session(&mut self, header: &H) -> Result<()> {
        match self.state {
            State::SessionOpen => return Err(WrtfError::SessionAlreadyOpen),
            State::Closed => return Err(WrtfError::WriterClosed),
            State::Fresh | State::Idle => {}
        }

        self.ensure_file_header_written()?;

        let offset = self.stream.stream_position()?;
        session::write_session_header(&mut self.stream, header)?;

        self.open_session = Some(OpenSession {
            offset,
            current_tick: 0,
            frame_count: 0,
        });
        self.state = State::SessionOpen;
        Ok(())
    }

    /// Appends one frame: an 8-byte tick header followed by the payload
    /// record, padded to the session's aligned total frame size.
    ///
    /// # Errors
    ///
    /// Fails with [`WrtfError::NoSessionOpen`] if no session is open, or
    /// [`WrtfError::TickOrderViolation`] if `tick` is less than the current
    /// tick and at least one frame has already been written in this
    /// session.
    pub fn write_frame(&mut self, tick: u64, payload: &P) -> Result<()> {
        {
            let open = self.open_session.as_ref().ok_or(WrtfError::NoSessionOpen)?;
            if open.frame_count > 0 && tick < open.current_tick {
                return Err(WrtfError::TickOrderViolation {
                    got: tick,
                    current: open.current_tick,
                });
            }
        }

        let frame_size = Self::aligned_frame_size();
        self.scratch.clear();
        self.scratch.resize(frame_size, 0);
        self.scratch[0..FRAME_HEADER_SIZE].copy_from_slice(&tick.to_le_bytes());
        payload.write_to(&mut self.scratch[FRAME_HEADER_SIZE..FRAME_HEADER_SIZE + P::SIZE]);
        self.stream.write_all(&self.scratch)?;

        let open = self.open_session.as_mut().expect("checked above");
        open.current_tick = tick;
        open.frame_count += 1;
        Ok(())
    }

    /// Closes the current session, writing its footer and appending a
    /// session-index entry to the in-memory index.
    ///
    /// # Errors
    ///
    /// Fails with [`WrtfError::NoSessionOpen`] if no session is open.
    pub fn end_session(&mut self, footer: &F) -> Result<()> {
        self.end_session_with(footer, false)
    }

    fn end_session_with(&mut self, footer: &F, synthetic: bool) -> Result<()> {
        let open = self.open_session.take().ok_or(WrtfError::NoSessionOpen)?;

        let footer_offset = self.stream.stream_position()?;
        let write_result = session::write_session_footer(
            &mut self.stream,
            open.current_tick,
            open.frame_count,
            footer,
        );

        if synthetic {
            // Disposal best-effort path: swallow I/O errors so the document
            // footer still has a chance of being emitted (spec §4.4, §7).
            if write_result.is_err() {
                return Ok(());
            }
        } else {
            write_result?;
        }

        self.sessions.push(SessionIndexEntry {
            session_offset: open.offset,
            footer_offset,
            frame_count: open.frame_count,
        });
        self.state = State::Idle;
        Ok(())
    }

    /// Emits the document footer and flushes the stream. If a session is
    /// still open, it is first closed with a zero-initialized footer record
    /// (best-effort, per spec §4.4). Idempotent-safe to call only once;
    /// subsequent calls fail with [`WrtfError::WriterClosed`].
    ///
    /// # Errors
    ///
    /// Returns an I/O error from the document-footer emission itself;
    /// failures synthesizing the in-progress session's footer are swallowed
    /// to maximize the chance the document footer is still written.
    pub fn close(&mut self) -> Result<()> {
        if self.state == State::Closed {
            return Err(WrtfError::WriterClosed);
        }
        if self.state == State::SessionOpen {
            self.end_session_with(&F::default(), true)?;
        }
        self.ensure_file_header_written()?;
        self.write_document_footer()?;
        self.stream.flush()?;
        self.state = State::Closed;
        Ok(())
    }

    fn write_document_footer(&mut self) -> Result<()> {
        crate::layout::write_magic(&mut self.stream, DOC_FOOTER_START_MAGIC)?;
        for entry in &self.sessions {
            write_u64(&mut self.stream, entry.session_offset)?;
            write_u64(&mut self.stream, entry.footer_offset)?;
            write_u64(&mut self.stream, entry.frame_count)?;
        }
        write_u64(&mut self.stream, self.sessions.len() as u64)?;
        crate::layout::write_magic(&mut self.stream, DOC_FOOTER_END_MAGIC)?;
        Ok(())
    }

    /// Number of sessions fully written (closed) so far.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// `true` if a session is currently open.
    #[must_use]
    pub fn has_open_session(&self) -> bool {
        matches!(self.state, State::SessionOpen)
    }

    /// `true` if [`Writer::close`] has already run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self.state, State::Closed)
    }
}

impl<W: Write + Seek, H: FixedRecord, F: FixedRecord + Default, P: FixedRecord> Drop
    for Writer<W, H, F, P>
{
    /// Cancellation is cooperative (spec §5): dropping a writer that was
    /// never explicitly closed still attempts to synthesize an in-progress
    /// session's footer and emit the document footer, swallowing any I/O
    /// error from that tail so a panic or early return doesn't leave behind
    /// a file with no document footer.
    fn drop(&mut self) {
        if self.state != State::Closed {
            let _ = self.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    struct SessionHeaderRec {
        id: u32,
    }

    impl FixedRecord for SessionHeaderRec {
        const SIZE: usize = 4;
        fn read_from(bytes: &[u8]) -> Result<Self> {
            Ok(Self {
                id: u32::from_le_bytes(bytes[0..4].try_into().unwrap()),
            })
        }
        fn write_to(&self, out: &mut [u8]) {
            out[0..4].copy_from_slice(&self.id.to_le_bytes());
        }
    }

    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    struct SessionFooterRec {
        checksum: u32,
    }

    impl FixedRecord for SessionFooterRec {
        const SIZE: usize = 4;
        fn read_from(bytes: &[u8]) -> Result<Self> {
            Ok(Self {
                checksum: u32::from_le_bytes(bytes[0..4].try_into().unwrap()),
            })
        }
        fn write_to(&self, out: &mut [u8]) {
            out[0..4].copy_from_slice(&self.checksum.to_le_bytes());
        }
    }

    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    struct Payload {
        speed: u32,
        throttle: u32,
    }

    impl FixedRecord for Payload {
        const SIZE: usize = 8;
        fn read_from(bytes: &[u8]) -> Result<Self> {
            Ok(Self {
                speed: u32::from_le_bytes(bytes[0..4].try_into().unwrap()),
                throttle: u32::from_le_bytes(bytes[4..8].try_into().unwrap()),
            })
        }
        fn write_to(&self, out: &mut [u8]) {
            out[0..4].copy_from_slice(&self.speed.to_le_bytes());
            out[4..8].copy_from_slice(&self.throttle.to_le_bytes());
        }
    }

    type TestWriter = Writer<Cursor<Vec<u8>>, SessionHeaderRec, SessionFooterRec, Payload>;

    #[test]
    fn rejects_zero_sample_rate() {
        let err = TestWriter::new(Cursor::new(Vec::new()), 0, None).unwrap_err();
        assert!(matches!(err, WrtfError::InvalidSampleRate(0)));
    }

    #[test]
    fn no_bytes_written_before_first_session() {
        let writer = TestWriter::new(Cursor::new(Vec::new()), 60, None).unwrap();
        assert_eq!(writer.stream.get_ref().len(), 0);
    }

    #[test]
    fn begin_session_twice_fails() {
        let mut writer = TestWriter::new(Cursor::new(Vec::new()), 60, None).unwrap();
        writer.begin_session(&SessionHeaderRec { id: 1 }).unwrap();
        assert!(matches!(
            writer.begin_session(&SessionHeaderRec { id: 2 }),
            Err(WrtfError::SessionAlreadyOpen)
        ));
    }

    #[test]
    fn write_frame_without_session_fails() {
        let mut writer = TestWriter::new(Cursor::new(Vec::new()), 60, None).unwrap();
        assert!(matches!(
            writer.write_frame(0, &Payload::default()),
            Err(WrtfError::NoSessionOpen)
        ));
    }

    #[test]
    fn end_session_without_session_fails() {
        let mut writer = TestWriter::new(Cursor::new(Vec::new()), 60, None).unwrap();
        assert!(matches!(
            writer.end_session(&SessionFooterRec::default()),
            Err(WrtfError::NoSessionOpen)
        ));
    }

    #[test]
    fn rejects_non_monotonic_tick() {
        let mut writer = TestWriter::new(Cursor::new(Vec::new()), 60, None).unwrap();
        writer.begin_session(&SessionHeaderRec { id: 1 }).unwrap();
        writer.write_frame(5, &Payload::default()).unwrap();
        assert!(matches!(
            writer.write_frame(3, &Payload::default()),
            Err(WrtfError::TickOrderViolation { got: 3, current: 5 })
        ));
    }

    #[test]
    fn first_frame_tick_is_caller_specified() {
        let mut writer = TestWriter::new(Cursor::new(Vec::new()), 60, None).unwrap();
        writer.begin_session(&SessionHeaderRec { id: 1 }).unwrap();
        // Any first tick is accepted, including a nonzero one.
        writer.write_frame(42, &Payload::default()).unwrap();
    }

    #[test]
    fn stream_position_is_8_aligned_after_every_operation() {
        let mut writer = TestWriter::new(Cursor::new(Vec::new()), 60, None).unwrap();
        writer.begin_session(&SessionHeaderRec { id: 1 }).unwrap();
        assert_eq!(writer.stream.stream_position().unwrap() % 8, 0);
        writer.write_frame(0, &Payload::default()).unwrap();
        assert_eq!(writer.stream.stream_position().unwrap() % 8, 0);
        writer
            .end_session(&SessionFooterRec { checksum: 1 })
            .unwrap();
        assert_eq!(writer.stream.stream_position().unwrap() % 8, 0);
        writer.close().unwrap();
        assert_eq!(writer.stream.stream_position().unwrap() % 8, 0);
    }

    #[test]
    fn operations_after_close_fail() {
        let mut writer = TestWriter::new(Cursor::new(Vec::new()), 60, None).unwrap();
        writer.begin_session(&SessionHeaderRec { id: 1 }).unwrap();
        writer.end_session(&SessionFooterRec::default()).unwrap();
        writer.close().unwrap();
        assert!(matches!(
            writer.begin_session(&SessionHeaderRec { id: 2 }),
            Err(WrtfError::WriterClosed)
        ));
        assert!(matches!(writer.close(), Err(WrtfError::WriterClosed)));
    }

    #[test]
    fn close_with_open_session_synthesizes_footer() {
        let mut writer = TestWriter::new(Cursor::new(Vec::new()), 60, None).unwrap();
        writer.begin_session(&SessionHeaderRec { id: 1 }).unwrap();
        writer.write_frame(0, &Payload::default()).unwrap();
        writer.close().unwrap();
        assert!(!writer.has_open_session());
        assert_eq!(writer.session_count(), 1);
    }

    #[test]
    fn total_length_is_multiple_of_8_and_ends_in_end_marker() {
        let mut writer = TestWriter::new(Cursor::new(Vec::new()), 60, None).unwrap();
        writer.begin_session(&SessionHeaderRec { id: 1 }).unwrap();
        writer.write_frame(0, &Payload::default()).unwrap();
        writer.write_frame(5, &Payload::default()).unwrap();
        writer
            .end_session(&SessionFooterRec { checksum: 1 })
            .unwrap();
        writer.close().unwrap();

        let buf = writer.stream.get_ref().clone();
        assert_eq!(buf.len() % 8, 0);
        assert_eq!(&buf[buf.len() - 8..], b"WRDE0001");
    }

    /// An in-memory sink shared via `Rc<RefCell<_>>` so a test can inspect
    /// its contents after the `Writer` holding it has been dropped.
    #[derive(Clone)]
    struct SharedBuf(std::rc::Rc<std::cell::RefCell<Cursor<Vec<u8>>>>);

    impl SharedBuf {
        fn new() -> Self {
            Self(std::rc::Rc::new(std::cell::RefCell::new(Cursor::new(
                Vec::new(),
            ))))
        }

        fn snapshot(&self) -> Vec<u8> {
            self.0.borrow().get_ref().clone()
        }
    }

    impl std::io::Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().write(buf)
        }
        fn flush(&mut self) -> std::io::Result<()> {
            self.0.borrow_mut().flush()
        }
    }

    impl std::io::Seek for SharedBuf {
        fn seek(&mut self, pos: std::io::SeekFrom) -> std::io::Result<u64> {
            self.0.borrow_mut().seek(pos)
        }
    }

    #[test]
    fn drop_without_explicit_close_still_emits_document_footer() {
        let sink = SharedBuf::new();
        {
            let mut writer: Writer<SharedBuf, SessionHeaderRec, SessionFooterRec, Payload> =
                Writer::new(sink.clone(), 60, None).unwrap();
            writer.begin_session(&SessionHeaderRec { id: 1 }).unwrap();
            writer.write_frame(0, &Payload::default()).unwrap();
            writer.end_session(&SessionFooterRec::default()).unwrap();
            // No explicit `close()` call — the writer is dropped here.
        }

        let buf = sink.snapshot();
        assert_eq!(buf.len() % 8, 0);
        assert_eq!(&buf[buf.len() - 8..], b"WRDE0001");
    }

    #[test]
    fn drop_of_never_opened_writer_still_emits_file_header_and_doc_footer() {
        let sink = SharedBuf::new();
        {
            let _writer: Writer<SharedBuf, SessionHeaderRec, SessionFooterRec, Payload> =
                Writer::new(sink.clone(), 60, None).unwrap();
            // Never opened a session; drop must still produce a valid
            // zero-session file.
        }
        let buf = sink.snapshot();
        assert_eq!(buf.len() % 8, 0);
        assert_eq!(&buf[0..8], b"WRTF0001");
        assert_eq!(&buf[buf.len() - 8..], b"WRDE0001");
    }
}
