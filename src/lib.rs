//! WRTF v1: a binary telemetry container format for fixed-rate racing
//! simulation data.
//!
//! A WRTF file holds one or more *sessions*, each a sequence of fixed-rate
//! *frames* (a monotonic tick counter plus a caller-defined payload record),
//! bracketed by caller-defined session header/footer records and wrapped in
//! a document-level header, metadata dictionary, and footer. Every
//! structural boundary is 8-byte aligned, magic-tagged, and little-endian.
//!
//! This crate does not know or care what a session header, session footer,
//! or frame payload actually contains — callers supply their own types and
//! implement [`FixedRecord`] for them. The codec only ever needs
//! `FixedRecord::SIZE` and a raw-byte view.
//!
//! # Writing
//!
//! ```no_run
//! use std::fs::File;
//! use wrtf::{FixedRecord, Metadata, Result, Writer};
//!
//! # struct SessionHeader;
//! # #[derive(Default)]
//! # struct FooterRec;
//! # struct Frame;
//! # impl FixedRecord for SessionHeader {
//! #     const SIZE: usize = 0;
//! #     fn read_from(_: &[u8]) -> Result<Self> { Ok(Self) }
//! #     fn write_to(&self, _: &mut [u8]) {}
//! # }
//! # impl FixedRecord for FooterRec {
//! #     const SIZE: usize = 0;
//! #     fn read_from(_: &[u8]) -> Result<Self> { Ok(Self) }
//! #     fn write_to(&self, _: &mut [u8]) {}
//! # }
//! # impl FixedRecord for Frame {
//! #     const SIZE: usize = 0;
//! #     fn read_from(_: &[u8]) -> Result<Self> { Ok(Self) }
//! #     fn write_to(&self, _: &mut [u8]) {}
//! # }
//! # fn run() -> Result<()> {
//! let file = File::create("session.wrtf")?;
//! let mut metadata = Metadata::new();
//! metadata.insert("track", "monza")?;
//!
//! let mut writer: Writer<_, SessionHeader, FooterRec, Frame> =
//!     Writer::new(file, 60, Some(metadata))?;
//! writer.begin_session(&SessionHeader)?;
//! writer.write_frame(0, &Frame)?;
//! writer.end_session(&FooterRec::default())?;
//! writer.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Reading
//!
//! ```no_run
//! use std::fs::File;
//! use wrtf::{FixedRecord, Reader, Result};
//!
//! # #[derive(Clone)]
//! # struct SessionHeader;
//! # #[derive(Clone)]
//! # struct SessionFooter;
//! # struct Frame;
//! # impl FixedRecord for SessionHeader {
//! #     const SIZE: usize = 0;
//! #     fn read_from(_: &[u8]) -> Result<Self> { Ok(Self) }
//! #     fn write_to(&self, _: &mut [u8]) {}
//! # }
//! # impl FixedRecord for SessionFooter {
//! #     const SIZE: usize = 0;
//! #     fn read_from(_: &[u8]) -> Result<Self> { Ok(Self) }
//! #     fn write_to(&self, _: &mut [u8]) {}
//! # }
//! # impl FixedRecord for Frame {
//! #     const SIZE: usize = 0;
//! #     fn read_from(_: &[u8]) -> Result<Self> { Ok(Self) }
//! #     fn write_to(&self, _: &mut [u8]) {}
//! # }
//! # fn run() -> Result<()> {
//! let file = File::open("session.wrtf")?;
//! let mut reader: Reader<_, SessionHeader, SessionFooter, Frame> = Reader::open(file)?;
//! let sessions = reader.sessions().to_vec();
//! for session in &sessions {
//!     for frame in reader.frames(session)? {
//!         let (_tick, _payload) = frame?;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod error;
mod header;
mod layout;
mod metadata;
mod reader;
mod session;
mod wire;
mod writer;

pub use error::{Result, WrtfError};
pub use header::FileHeader;
pub use layout::{aligned_size, is_aligned, padding, FixedRecord};
pub use metadata::Metadata;
pub use reader::{Frames, Reader};
pub use session::SessionDescriptor;
pub use wire::{
    DOC_FOOTER_END_MAGIC, DOC_FOOTER_START_MAGIC, FILE_HEADER_SIZE, FILE_MAGIC, FORMAT_VERSION,
    SESSION_FOOTER_MAGIC, SESSION_HEADER_MAGIC,
};
pub use writer::Writer;
