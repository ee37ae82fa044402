//! Pass-through decorators.
//!
//! [`FilterReader`] and [`FilterWriter`] forward every operation to the stream
//! they wrap. The specialised decorators hold one and only intercept the calls
//! whose behaviour they change; everything else, including the open/closed
//! state, goes through here.

use std::io::{self, BufRead, Read, Seek, SeekFrom, Write};

use crate::source::Source;

fn closed_error() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "stream is closed")
}

#[derive(Debug)]
pub struct FilterReader<R> {
    inner: R,
    propagate_close: bool,
    closed: bool,
}

impl<R> FilterReader<R> {
    /// Wrap `inner` in a new pass-through decorator.
    pub fn new(inner: R) -> FilterReader<R> {
        FilterReader {
            inner,
            propagate_close: true,
            closed: false,
        }
    }

    /// Whether [`Source::close`] also closes the wrapped stream. Defaults to `true`.
    pub fn propagate_close(mut self, propagate: bool) -> FilterReader<R> {
        self.propagate_close = propagate;
        self
    }

    /// Whether this decorator has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Get a reference to the wrapped stream.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Reading from the wrapped stream directly desynchronises any decorator
    /// built on this one.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Consume the reader, returning the wrapped stream.
    pub fn into_inner(self) -> R {
        self.inner
    }

    #[inline(always)]
    fn check_open(&self) -> io::Result<()> {
        if self.closed {
            Err(closed_error())
        } else {
            Ok(())
        }
    }
}

impl<R: Read> Read for FilterReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.check_open()?;
        self.inner.read(buf)
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> io::Result<()> {
        self.check_open()?;
        self.inner.read_exact(buf)
    }
}

impl<R: BufRead> BufRead for FilterReader<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.check_open()?;
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.inner.consume(amt)
    }
}

impl<R: Seek> Seek for FilterReader<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.check_open()?;
        self.inner.seek(pos)
    }
}

impl<R: Source> Source for FilterReader<R> {
    fn available(&self) -> usize {
        if self.closed {
            0
        } else {
            self.inner.available()
        }
    }

    fn next_byte(&mut self) -> io::Result<Option<u8>> {
        self.check_open()?;
        self.inner.next_byte()
    }

    fn read_whole(&mut self, buf: &mut [u8]) -> io::Result<()> {
        self.check_open()?;
        self.inner.read_whole(buf)
    }

    fn mark_supported(&self) -> bool {
        self.inner.mark_supported()
    }

    fn mark(&mut self) {
        self.inner.mark()
    }

    fn reset(&mut self) -> io::Result<()> {
        self.check_open()?;
        self.inner.reset()
    }

    fn skip(&mut self, n: u64) -> io::Result<u64> {
        self.check_open()?;
        self.inner.skip(n)
    }

    fn read_plain(&mut self, buf: &mut [u8]) -> io::Result<()> {
        self.check_open()?;
        self.inner.read_plain(buf)
    }

    fn close(&mut self) -> io::Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        if self.propagate_close {
            self.inner.close()
        } else {
            tracing::trace!("closed view, wrapped source left open");
            Ok(())
        }
    }
}

#[derive(Debug)]
pub struct FilterWriter<W> {
    inner: W,
    closed: bool,
}

impl<W> FilterWriter<W> {
    /// Wrap `inner` in a new pass-through decorator.
    pub fn new(inner: W) -> FilterWriter<W> {
        FilterWriter {
            inner,
            closed: false,
        }
    }

    /// Whether this decorator has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Get a reference to the wrapped sink.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Get a mutable reference to the wrapped sink.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    /// Consume the writer, returning the wrapped sink.
    pub fn into_inner(self) -> W {
        self.inner
    }

    #[inline(always)]
    fn check_open(&self) -> io::Result<()> {
        if self.closed {
            Err(closed_error())
        } else {
            Ok(())
        }
    }
}

impl<W: Write> FilterWriter<W> {
    /// Flushes the wrapped sink and refuses any further writes.
    pub fn close(&mut self) -> io::Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.inner.flush()
    }
}

impl<W: Write> Write for FilterWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.check_open()?;
        self.inner.write(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.check_open()?;
        self.inner.write_all(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.check_open()?;
        self.inner.flush()
    }
}

impl<W: Seek> Seek for FilterWriter<W> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.check_open()?;
        self.inner.seek(pos)
    }
}
