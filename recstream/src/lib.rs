//! Byte-level building blocks for reading and writing fixed-layout records in
//! legacy container formats.
//!
//! Record parsers take a [`Source`], usually an in-memory [`ByteSource`], cut
//! it into per-record [`BoundedReader`] views and pull fields out through the
//! [`LittleEndianInput`] codec. When the bytes arrive from a transport that
//! hands out partial chunks, a [`BlockingReader`] goes underneath. Record
//! writers emit fields through [`LittleEndianOutput`] and use
//! [`DelayableOutput`] to fill in lengths that are only known after the body
//! has been written.

mod array;
mod blocking;
mod bounded;
mod codec;
mod delayed;
pub mod endian;
mod error;
mod filter;
mod source;

pub use array::ByteArrayWriter;
pub use blocking::{BlockingReader, FillPolicy};
pub use bounded::BoundedReader;
pub use codec::{LittleEndianInput, LittleEndianOutput, LittleEndianReader, LittleEndianWriter};
pub use delayed::{DelayableOutput, DelayedSlot, PatchableWriter, SeekableSink};
pub use error::{Error, Result};
pub use filter::{FilterReader, FilterWriter};
pub use source::{ByteSource, Source};
