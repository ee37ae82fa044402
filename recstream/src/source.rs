//! Byte sources: the capability every decorator in this crate consumes, and
//! an in-memory implementation of it.

use std::io::{self, BufRead, Read, Seek, SeekFrom};

use crate::error::{Error, Result};

/// A readable byte stream with the extra capabilities record parsers lean on.
///
/// End of stream is `Ok(0)` from [`Read::read`] and `Ok(None)` from
/// [`Source::next_byte`]; it is never an error at this level.
pub trait Source: Read {
    /// Number of bytes that can be read without blocking or failing.
    ///
    /// This must not move the stream position.
    fn available(&self) -> usize;

    /// Reads a single byte, `None` at end of stream.
    fn next_byte(&mut self) -> io::Result<Option<u8>> {
        let mut byte = [0u8; 1];
        loop {
            match self.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Fills `buf` completely or fails with `UnexpectedEof`.
    ///
    /// Sources that know where their data ends fail without consuming
    /// anything. The default delegates to [`Read::read_exact`], which may
    /// leave part of the request consumed.
    fn read_whole(&mut self, buf: &mut [u8]) -> io::Result<()> {
        self.read_exact(buf)
    }

    fn mark_supported(&self) -> bool {
        false
    }

    /// Remembers the current position for a later [`Source::reset`].
    fn mark(&mut self) {}

    fn reset(&mut self) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "mark/reset not supported",
        ))
    }

    /// Discards up to `n` bytes, returning how many were actually skipped.
    fn skip(&mut self, n: u64) -> io::Result<u64> {
        let mut scratch = [0u8; 512];
        let mut skipped = 0u64;
        while skipped < n {
            let want = (n - skipped).min(scratch.len() as u64) as usize;
            match self.read(&mut scratch[..want]) {
                Ok(0) => break,
                Ok(count) => skipped += count as u64,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(skipped)
    }

    /// Fills `buf` with bytes exactly as they are stored.
    ///
    /// Sources that transparently decrypt override this to bypass the
    /// decryption; everything else reads normally.
    fn read_plain(&mut self, buf: &mut [u8]) -> io::Result<()> {
        self.read_whole(buf)
    }

    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<S: Source + ?Sized> Source for &mut S {
    fn available(&self) -> usize {
        (**self).available()
    }

    fn next_byte(&mut self) -> io::Result<Option<u8>> {
        (**self).next_byte()
    }

    fn read_whole(&mut self, buf: &mut [u8]) -> io::Result<()> {
        (**self).read_whole(buf)
    }

    fn mark_supported(&self) -> bool {
        (**self).mark_supported()
    }

    fn mark(&mut self) {
        (**self).mark()
    }

    fn reset(&mut self) -> io::Result<()> {
        (**self).reset()
    }

    fn skip(&mut self, n: u64) -> io::Result<u64> {
        (**self).skip(n)
    }

    fn read_plain(&mut self, buf: &mut [u8]) -> io::Result<()> {
        (**self).read_plain(buf)
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

impl<S: Source + ?Sized> Source for Box<S> {
    fn available(&self) -> usize {
        (**self).available()
    }

    fn next_byte(&mut self) -> io::Result<Option<u8>> {
        (**self).next_byte()
    }

    fn read_whole(&mut self, buf: &mut [u8]) -> io::Result<()> {
        (**self).read_whole(buf)
    }

    fn mark_supported(&self) -> bool {
        (**self).mark_supported()
    }

    fn mark(&mut self) {
        (**self).mark()
    }

    fn reset(&mut self) -> io::Result<()> {
        (**self).reset()
    }

    fn skip(&mut self, n: u64) -> io::Result<u64> {
        (**self).skip(n)
    }

    fn read_plain(&mut self, buf: &mut [u8]) -> io::Result<()> {
        (**self).read_plain(buf)
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

fn short_read(needed: usize, available: usize) -> io::Error {
    io::Error::new(
        io::ErrorKind::UnexpectedEof,
        format!("needed {} bytes, {} available", needed, available),
    )
}

impl Source for &[u8] {
    fn available(&self) -> usize {
        self.len()
    }

    fn read_whole(&mut self, buf: &mut [u8]) -> io::Result<()> {
        if buf.len() > self.len() {
            return Err(short_read(buf.len(), self.len()));
        }
        self.read_exact(buf)
    }

    fn skip(&mut self, n: u64) -> io::Result<u64> {
        let count = (n.min(self.len() as u64)) as usize;
        *self = &self[count..];
        Ok(count as u64)
    }
}

impl<T: AsRef<[u8]>> Source for io::Cursor<T> {
    fn available(&self) -> usize {
        let len = self.get_ref().as_ref().len() as u64;
        len.saturating_sub(self.position()) as usize
    }

    fn read_whole(&mut self, buf: &mut [u8]) -> io::Result<()> {
        let available = self.available();
        if buf.len() > available {
            return Err(short_read(buf.len(), available));
        }
        self.read_exact(buf)
    }
}

/// An in-memory byte source over any buffer.
///
/// The buffer is borrowed or owned as `B` and never copied. A source can view
/// the whole buffer or only a sub-range of it (see
/// [`ByteSource::with_range`]); positions are always relative to the start of
/// the view.
///
/// A `ByteSource` belongs to a single owner. To read one from several threads,
/// put it behind a mutex at the point where it is shared.
#[derive(Debug, Clone)]
pub struct ByteSource<B> {
    buf: B,
    start: usize,
    pos: usize,
    mark: usize,
    end: usize,
}

impl<B: AsRef<[u8]>> ByteSource<B> {
    /// Create a source viewing the whole of `buf`.
    pub fn new(buf: B) -> ByteSource<B> {
        let end = buf.as_ref().len();
        ByteSource {
            buf,
            start: 0,
            pos: 0,
            mark: 0,
            end,
        }
    }

    /// View `len` bytes of `buf` starting at `offset`.
    pub fn with_range(buf: B, offset: usize, len: usize) -> Result<ByteSource<B>> {
        let total = buf.as_ref().len();
        let end = match offset.checked_add(len) {
            Some(end) if end <= total => end,
            _ => return Err(Error::end_of_input(len, total.saturating_sub(offset))),
        };

        Ok(ByteSource {
            buf,
            start: offset,
            pos: offset,
            mark: offset,
            end,
        })
    }

    /// Get the position relative to the start of the view.
    #[inline(always)]
    pub fn position(&self) -> usize {
        self.pos - self.start
    }

    /// Length of the view.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the view covers no bytes.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    /// Bytes left between the position and the end of the view.
    #[inline(always)]
    pub fn remaining(&self) -> usize {
        self.end - self.pos
    }

    /// Get the unread part of the view without consuming it.
    #[inline(always)]
    pub fn remaining_slice(&self) -> &[u8] {
        &self.buf.as_ref()[self.pos..self.end]
    }

    /// Get a reference to the underlying buffer.
    pub fn get_ref(&self) -> &B {
        &self.buf
    }

    /// Consume the source, returning the underlying buffer.
    pub fn into_inner(self) -> B {
        self.buf
    }

    /// Consumes exactly `n` bytes, or none at all.
    pub(crate) fn take_slice(&mut self, n: usize) -> Result<&[u8]> {
        let available = self.remaining();
        if n > available {
            return Err(Error::end_of_input(n, available));
        }
        let from = self.pos;
        self.pos += n;
        Ok(&self.buf.as_ref()[from..self.pos])
    }
}

#[cfg(feature = "mmap")]
impl ByteSource<memmap2::Mmap> {
    /// Memory-maps `file` and views the whole mapping.
    ///
    /// # Safety
    ///
    /// The file must not be modified or truncated while the mapping is alive.
    pub unsafe fn map(file: &std::fs::File) -> io::Result<ByteSource<memmap2::Mmap>> {
        let mmap = memmap2::Mmap::map(file)?;
        tracing::debug!(len = mmap.len(), "mapped byte source");
        Ok(ByteSource::new(mmap))
    }
}

impl<B: AsRef<[u8]>> Read for ByteSource<B> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let count = buf.len().min(self.remaining());
        buf[..count].copy_from_slice(&self.buf.as_ref()[self.pos..self.pos + count]);
        self.pos += count;
        Ok(count)
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> io::Result<()> {
        let bytes = self.take_slice(buf.len())?;
        buf.copy_from_slice(bytes);
        Ok(())
    }
}

impl<B: AsRef<[u8]>> BufRead for ByteSource<B> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        Ok(self.remaining_slice())
    }

    fn consume(&mut self, amt: usize) {
        self.pos += amt.min(self.remaining());
    }
}

impl<B: AsRef<[u8]>> Seek for ByteSource<B> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let (base, offset) = match pos {
            SeekFrom::Start(n) => (0i128, n as i128),
            SeekFrom::End(n) => (self.len() as i128, n as i128),
            SeekFrom::Current(n) => (self.position() as i128, n as i128),
        };
        let target = base + offset;
        if target < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before start of byte source",
            ));
        }
        let target = (target as u128).min(self.len() as u128) as usize;
        self.pos = self.start + target;
        Ok(target as u64)
    }
}

impl<B: AsRef<[u8]>> Source for ByteSource<B> {
    #[inline(always)]
    fn available(&self) -> usize {
        self.remaining()
    }

    fn next_byte(&mut self) -> io::Result<Option<u8>> {
        if self.pos == self.end {
            return Ok(None);
        }
        let byte = self.buf.as_ref()[self.pos];
        self.pos += 1;
        Ok(Some(byte))
    }

    fn mark_supported(&self) -> bool {
        true
    }

    fn mark(&mut self) {
        self.mark = self.pos;
    }

    fn reset(&mut self) -> io::Result<()> {
        tracing::trace!(
            from = format_args!("{:#x}", self.position()),
            to = format_args!("{:#x}", self.mark - self.start),
            "reset byte source"
        );
        self.pos = self.mark;
        Ok(())
    }

    fn skip(&mut self, n: u64) -> io::Result<u64> {
        let count = n.min(self.remaining() as u64) as usize;
        self.pos += count;
        Ok(count as u64)
    }
}
