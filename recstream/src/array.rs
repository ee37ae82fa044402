use std::io;

use crate::codec::LittleEndianOutput;
use crate::delayed::{self, DelayableOutput, DelayedSlot};
use crate::endian;
use crate::error::{Error, Result};

/// Writes little-endian fields into a fixed region of a caller-owned buffer.
///
/// Writes that do not fit fail with [`Error::BufferOverrun`] and leave the
/// buffer untouched.
#[derive(Debug)]
pub struct ByteArrayWriter<B> {
    buf: B,
    start: usize,
    pos: usize,
    end: usize,
    id: u64,
    outstanding: usize,
}

impl<B: AsMut<[u8]>> ByteArrayWriter<B> {
    /// Create a writer over the whole of `buf`.
    pub fn new(mut buf: B) -> ByteArrayWriter<B> {
        let end = buf.as_mut().len();
        ByteArrayWriter {
            buf,
            start: 0,
            pos: 0,
            end,
            id: delayed::next_output_id(),
            outstanding: 0,
        }
    }

    /// Write into `len` bytes of `buf` starting at `offset`.
    pub fn with_range(mut buf: B, offset: usize, len: usize) -> Result<ByteArrayWriter<B>> {
        let total = buf.as_mut().len();
        let end = match offset.checked_add(len) {
            Some(end) if end <= total => end,
            _ => {
                return Err(Error::BufferOverrun {
                    needed: len,
                    remaining: total.saturating_sub(offset),
                })
            }
        };

        Ok(ByteArrayWriter {
            buf,
            start: offset,
            pos: offset,
            end,
            id: delayed::next_output_id(),
            outstanding: 0,
        })
    }

    /// Index in the underlying buffer where the next byte goes.
    #[inline(always)]
    pub fn write_index(&self) -> usize {
        self.pos
    }

    /// Bytes written since the start of the region.
    #[inline(always)]
    pub fn written(&self) -> usize {
        self.pos - self.start
    }

    /// Bytes that still fit before the end of the region.
    #[inline(always)]
    pub fn remaining(&self) -> usize {
        self.end - self.pos
    }

    /// Reserved slots not yet materialized.
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Release the buffer.
    pub fn into_inner(self) -> B {
        if self.outstanding > 0 {
            tracing::warn!(
                outstanding = self.outstanding,
                "byte array writer released with unmaterialized slots"
            );
        }
        self.buf
    }

    #[inline(always)]
    fn ensure(&self, needed: usize) -> Result<()> {
        let remaining = self.remaining();
        if needed > remaining {
            return Err(Error::BufferOverrun { needed, remaining });
        }
        Ok(())
    }
}

impl<B: AsRef<[u8]>> ByteArrayWriter<B> {
    /// The bytes written so far.
    pub fn as_written(&self) -> &[u8] {
        &self.buf.as_ref()[self.start..self.pos]
    }
}

impl<B: AsMut<[u8]>> LittleEndianOutput for ByteArrayWriter<B> {
    fn write_byte(&mut self, value: u8) -> Result<()> {
        endian::put_u8(&mut self.buf.as_mut()[..self.end], self.pos, value)?;
        self.pos += 1;
        Ok(())
    }

    fn write_bytes(&mut self, buf: &[u8]) -> Result<()> {
        self.ensure(buf.len())?;
        self.buf.as_mut()[self.pos..self.pos + buf.len()].copy_from_slice(buf);
        self.pos += buf.len();
        Ok(())
    }

    fn write_short(&mut self, value: i16) -> Result<()> {
        endian::put_i16(&mut self.buf.as_mut()[..self.end], self.pos, value)?;
        self.pos += 2;
        Ok(())
    }

    fn write_int(&mut self, value: i32) -> Result<()> {
        endian::put_i32(&mut self.buf.as_mut()[..self.end], self.pos, value)?;
        self.pos += 4;
        Ok(())
    }

    fn write_long(&mut self, value: i64) -> Result<()> {
        // Both halves must fit before the low half goes out.
        self.ensure(8)?;
        self.write_int(value as i32)?;
        self.write_int((value >> 32) as i32)
    }
}

impl<B: AsMut<[u8]>> io::Write for ByteArrayWriter<B> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let count = buf.len().min(self.remaining());
        self.write_bytes(&buf[..count])?;
        Ok(count)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<B: AsMut<[u8]>> DelayableOutput for ByteArrayWriter<B> {
    fn reserve(&mut self, len: usize) -> Result<DelayedSlot> {
        self.ensure(len)?;
        let offset = self.pos;
        self.buf.as_mut()[offset..offset + len].fill(0);
        self.pos += len;
        self.outstanding += 1;

        tracing::debug!(
            offset = format_args!("{:#x}", offset),
            len,
            "reserved delayed slot"
        );
        Ok(DelayedSlot::new(self.id, offset as u64, len))
    }

    fn materialize<F>(&mut self, slot: DelayedSlot, fill: F) -> Result<()>
    where
        F: FnOnce(&mut ByteArrayWriter<&mut [u8]>) -> Result<()>,
    {
        if slot.owner() != self.id {
            return Err(Error::ForeignSlot);
        }
        let offset = slot.offset() as usize;
        let region = &mut self.buf.as_mut()[offset..offset + slot.len()];
        delayed::fill_slot(region, fill)?;
        self.outstanding -= 1;

        tracing::debug!(
            offset = format_args!("{:#x}", offset),
            len = slot.len(),
            "materialized delayed slot"
        );
        Ok(())
    }
}
