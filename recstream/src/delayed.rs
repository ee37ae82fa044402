//! Delayed output: reserve room for a field now, fill it in once its value is
//! known.
//!
//! The usual case is a record header carrying the length of the body that
//! follows it. The writer reserves the header field, writes the body, then
//! materializes the field with the final length. The result is byte-for-byte
//! what writing the length up front would have produced.

use std::io::{self, Seek, SeekFrom, Write};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::array::ByteArrayWriter;
use crate::codec::{LittleEndianOutput, LittleEndianWriter};
use crate::error::{Error, Result};

static NEXT_OUTPUT_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_output_id() -> u64 {
    NEXT_OUTPUT_ID.fetch_add(1, Ordering::Relaxed)
}

/// A sink that can seek back to patch earlier output.
pub trait SeekableSink: Write + Seek {}

impl<T: Write + Seek + ?Sized> SeekableSink for T {}

/// A reserved, not yet written, byte range in an output.
///
/// Only the output that issued a slot can materialize it, and doing so
/// consumes the slot.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a reserved slot keeps its placeholder bytes until it is materialized"]
pub struct DelayedSlot {
    owner: u64,
    offset: u64,
    len: usize,
}

impl DelayedSlot {
    pub(crate) fn new(owner: u64, offset: u64, len: usize) -> DelayedSlot {
        DelayedSlot { owner, offset, len }
    }

    pub(crate) fn owner(&self) -> u64 {
        self.owner
    }

    /// Position of the slot in the output.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Size of the slot in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the slot covers no bytes.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

pub trait DelayableOutput: LittleEndianOutput {
    /// Writes `len` zero bytes at the current position and hands back the
    /// slot covering them.
    fn reserve(&mut self, len: usize) -> Result<DelayedSlot>;

    /// Fills a reserved slot. `fill` must write exactly `slot.len()` bytes;
    /// the position for new writes does not change.
    fn materialize<F>(&mut self, slot: DelayedSlot, fill: F) -> Result<()>
    where
        F: FnOnce(&mut ByteArrayWriter<&mut [u8]>) -> Result<()>;
}

/// Runs `fill` over `region` and checks that it covered all of it.
pub(crate) fn fill_slot<F>(region: &mut [u8], fill: F) -> Result<()>
where
    F: FnOnce(&mut ByteArrayWriter<&mut [u8]>) -> Result<()>,
{
    let expected = region.len();
    let mut writer = ByteArrayWriter::new(region);
    fill(&mut writer)?;
    let written = writer.written();
    if written != expected {
        return Err(Error::SlotLength { expected, written });
    }
    Ok(())
}

/// A little-endian writer over a seekable sink, able to patch reserved slots.
///
/// Construction checks that the sink can actually report and change its
/// position, so a pipe or terminal is rejected up front instead of producing
/// a corrupt stream later.
#[derive(Debug)]
pub struct PatchableWriter<W: SeekableSink> {
    out: LittleEndianWriter<W>,
    id: u64,
    outstanding: usize,
}

impl<W: SeekableSink> PatchableWriter<W> {
    /// Create a patchable writer, failing with [`Error::NonSeekableOutput`] if
    /// `sink` cannot seek.
    pub fn new(mut sink: W) -> Result<PatchableWriter<W>> {
        let start = sink.stream_position().map_err(Error::NonSeekableOutput)?;
        sink.seek(SeekFrom::Start(start)).map_err(Error::NonSeekableOutput)?;

        Ok(PatchableWriter {
            out: LittleEndianWriter::new(sink),
            id: next_output_id(),
            outstanding: 0,
        })
    }

    /// Get the position where the next write lands.
    pub fn position(&mut self) -> Result<u64> {
        Ok(self.out.get_mut().stream_position()?)
    }

    /// Reserved slots not yet materialized.
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Get a reference to the wrapped sink.
    pub fn get_ref(&self) -> &W {
        self.out.get_ref()
    }

    /// Flushes the sink and hands it back.
    ///
    /// Slots still outstanding keep their placeholder bytes; each is logged.
    pub fn finish(mut self) -> Result<W> {
        if self.outstanding > 0 {
            tracing::warn!(
                outstanding = self.outstanding,
                "finished output with unmaterialized slots"
            );
        }
        self.out.close()?;
        Ok(self.out.into_inner())
    }
}

impl<W: SeekableSink> LittleEndianOutput for PatchableWriter<W> {
    fn write_byte(&mut self, value: u8) -> Result<()> {
        self.out.write_byte(value)
    }

    fn write_bytes(&mut self, buf: &[u8]) -> Result<()> {
        self.out.write_bytes(buf)
    }

    fn write_short(&mut self, value: i16) -> Result<()> {
        self.out.write_short(value)
    }

    fn write_int(&mut self, value: i32) -> Result<()> {
        self.out.write_int(value)
    }
}

impl<W: SeekableSink> DelayableOutput for PatchableWriter<W> {
    fn reserve(&mut self, len: usize) -> Result<DelayedSlot> {
        let offset = self.position()?;
        self.out.write_bytes(&vec![0u8; len])?;
        self.outstanding += 1;

        tracing::debug!(
            offset = format_args!("{:#x}", offset),
            len,
            "reserved delayed slot"
        );
        Ok(DelayedSlot::new(self.id, offset, len))
    }

    fn materialize<F>(&mut self, slot: DelayedSlot, fill: F) -> Result<()>
    where
        F: FnOnce(&mut ByteArrayWriter<&mut [u8]>) -> Result<()>,
    {
        if slot.owner() != self.id {
            return Err(Error::ForeignSlot);
        }
        let mut bytes = vec![0u8; slot.len()];
        fill_slot(&mut bytes, fill)?;

        // Go back, patch, and return to where new writes continue.
        let sink = self.out.get_mut();
        let resume = sink.stream_position()?;
        sink.seek(SeekFrom::Start(slot.offset()))?;
        sink.write_all(&bytes)?;
        sink.seek(SeekFrom::Start(resume))?;
        self.outstanding -= 1;

        tracing::debug!(
            offset = format_args!("{:#x}", slot.offset()),
            end = format_args!("{:#x}", resume),
            len = slot.len(),
            "materialized delayed slot"
        );
        Ok(())
    }
}

impl<W: SeekableSink> Write for PatchableWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(self.out.flush()?)
    }
}
