use std::io::{self, Read};

use crate::filter::FilterReader;
use crate::source::Source;

/// Presents at most `max` bytes of the wrapped source as a complete stream.
///
/// Once the bound is reached every read reports end of stream, whatever the
/// wrapped source still holds. Sibling views over one source share its
/// cursor: wrap `&mut source` in each view in turn and do not read the source
/// directly while a view is in use.
#[derive(Debug)]
pub struct BoundedReader<R> {
    inner: FilterReader<R>,
    max: Option<u64>,
    consumed: u64,
    mark: u64,
}

impl<R> BoundedReader<R> {
    /// Create a view of at most `max` bytes of `inner`.
    pub fn new(inner: R, max: u64) -> BoundedReader<R> {
        tracing::debug!(max, "bounded view");
        BoundedReader {
            inner: FilterReader::new(inner),
            max: Some(max),
            consumed: 0,
            mark: 0,
        }
    }

    /// A view with no bound; behaves like its wrapped source.
    pub fn unbounded(inner: R) -> BoundedReader<R> {
        BoundedReader {
            inner: FilterReader::new(inner),
            max: None,
            consumed: 0,
            mark: 0,
        }
    }

    /// Whether closing this view closes the wrapped source. Defaults to `true`;
    /// turn it off for views over a source that outlives them.
    pub fn propagate_close(mut self, propagate: bool) -> BoundedReader<R> {
        self.inner = self.inner.propagate_close(propagate);
        self
    }

    /// The bound, `None` when unbounded.
    #[inline(always)]
    pub fn max(&self) -> Option<u64> {
        self.max
    }

    /// Bytes handed out so far.
    #[inline(always)]
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Bytes left before the bound, `None` when unbounded.
    pub fn remaining(&self) -> Option<u64> {
        self.max.map(|_| self.left())
    }

    /// Get a reference to the wrapped source.
    pub fn get_ref(&self) -> &R {
        self.inner.get_ref()
    }

    /// Consume the view, returning the wrapped source.
    pub fn into_inner(self) -> R {
        self.inner.into_inner()
    }

    #[inline(always)]
    fn left(&self) -> u64 {
        match self.max {
            Some(max) => {
                assert!(
                    self.consumed <= max,
                    "bounded reader consumed {} bytes past a bound of {}",
                    self.consumed,
                    max
                );
                max - self.consumed
            }
            None => u64::MAX,
        }
    }

    #[inline(always)]
    fn advance(&mut self, count: u64) {
        self.consumed += count;
        debug_assert!(self.max.map_or(true, |max| self.consumed <= max));
    }

    fn check_bound(&self, len: usize) -> io::Result<()> {
        if len as u64 > self.left() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "read past end of bounded view",
            ));
        }
        Ok(())
    }

    fn bound_reached(&self) {
        tracing::trace!(consumed = self.consumed, "bounded view exhausted");
    }
}

impl<R: Read> Read for BoundedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let left = self.left();
        if left == 0 {
            self.bound_reached();
            return Ok(0);
        }

        let want = (buf.len() as u64).min(left) as usize;
        let count = self.inner.read(&mut buf[..want])?;
        self.advance(count as u64);
        Ok(count)
    }

    fn read_exact(&mut self, mut buf: &mut [u8]) -> io::Result<()> {
        self.check_bound(buf.len())?;
        // Go through `read` so a short wrapped source still gets counted.
        while !buf.is_empty() {
            match self.read(buf) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "wrapped source ended inside bounded view",
                    ))
                }
                Ok(count) => buf = &mut buf[count..],
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

impl<R: Source> Source for BoundedReader<R> {
    fn available(&self) -> usize {
        let left = self.left().min(usize::MAX as u64) as usize;
        self.inner.available().min(left)
    }

    fn next_byte(&mut self) -> io::Result<Option<u8>> {
        if self.left() == 0 {
            self.bound_reached();
            return Ok(None);
        }
        let byte = self.inner.next_byte()?;
        if byte.is_some() {
            self.advance(1);
        }
        Ok(byte)
    }

    fn read_whole(&mut self, buf: &mut [u8]) -> io::Result<()> {
        self.check_bound(buf.len())?;
        self.inner.read_whole(buf)?;
        self.advance(buf.len() as u64);
        Ok(())
    }

    fn mark_supported(&self) -> bool {
        self.inner.mark_supported()
    }

    fn mark(&mut self) {
        self.inner.mark();
        self.mark = self.consumed;
    }

    fn reset(&mut self) -> io::Result<()> {
        self.inner.reset()?;
        self.consumed = self.mark;
        Ok(())
    }

    fn skip(&mut self, n: u64) -> io::Result<u64> {
        let skipped = self.inner.skip(n.min(self.left()))?;
        self.advance(skipped);
        Ok(skipped)
    }

    fn read_plain(&mut self, buf: &mut [u8]) -> io::Result<()> {
        self.check_bound(buf.len())?;
        self.inner.read_plain(buf)?;
        self.advance(buf.len() as u64);
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.inner.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ByteSource;

    fn hundred() -> ByteSource<Vec<u8>> {
        ByteSource::new((0..100u8).collect())
    }

    #[test]
    fn short_source_is_still_counted() {
        let mut view = BoundedReader::new(&[1u8, 2][..], 5);
        let mut buf = [0u8; 4];
        assert_eq!(
            view.read_exact(&mut buf).unwrap_err().kind(),
            io::ErrorKind::UnexpectedEof
        );
        assert_eq!(view.consumed(), 2);
        assert_eq!(view.remaining(), Some(3));
    }

    #[test]
    fn caps_total_bytes() {
        let mut view = BoundedReader::new(hundred(), 5);
        let mut buf = [0u8; 3];
        assert_eq!(view.read(&mut buf).unwrap(), 3);
        assert_eq!(view.next_byte().unwrap(), Some(3));
        assert_eq!(view.read(&mut buf).unwrap(), 1);
        assert_eq!(buf[0], 4);
        assert_eq!(view.read(&mut buf).unwrap(), 0);
        assert_eq!(view.next_byte().unwrap(), None);
        assert_eq!(view.consumed(), 5);
        assert_eq!(view.get_ref().available(), 95);
    }

    #[test]
    fn zero_bound_is_empty() {
        let mut view = BoundedReader::new(hundred(), 0);
        assert_eq!(view.next_byte().unwrap(), None);
        assert_eq!(view.available(), 0);
        assert_eq!(view.get_ref().position(), 0);
    }

    #[test]
    fn available_reflects_bound() {
        let mut view = BoundedReader::new(hundred(), 10);
        assert_eq!(view.available(), 10);
        view.skip(4).unwrap();
        assert_eq!(view.available(), 6);
        assert_eq!(view.available(), 6);

        let short = BoundedReader::new(ByteSource::new(vec![0u8; 3]), 10);
        assert_eq!(short.available(), 3);
    }

    #[test]
    fn unbounded_passes_through() {
        let mut view = BoundedReader::unbounded(hundred());
        let mut all = Vec::new();
        view.read_to_end(&mut all).unwrap();
        assert_eq!(all.len(), 100);
        assert_eq!(view.remaining(), None);
    }

    #[test]
    fn read_exact_past_bound_consumes_nothing() {
        let mut view = BoundedReader::new(hundred(), 6);
        view.skip(3).unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(
            view.read_exact(&mut buf).unwrap_err().kind(),
            io::ErrorKind::UnexpectedEof
        );
        assert_eq!(view.consumed(), 3);
        assert_eq!(view.get_ref().position(), 3);
    }

    #[test]
    fn reset_restores_accounting() {
        let mut view = BoundedReader::new(hundred(), 8);
        view.skip(2).unwrap();
        view.mark();
        view.skip(6).unwrap();
        assert_eq!(view.next_byte().unwrap(), None);

        view.reset().unwrap();
        assert_eq!(view.consumed(), 2);
        assert_eq!(view.next_byte().unwrap(), Some(2));
        assert_eq!(view.remaining(), Some(5));
    }

    #[test]
    fn sibling_views_share_cursor() {
        let mut source = hundred();

        let mut first = BoundedReader::new(&mut source, 4).propagate_close(false);
        let mut head = Vec::new();
        first.read_to_end(&mut head).unwrap();
        first.close().unwrap();
        assert_eq!(head, vec![0, 1, 2, 3]);

        let mut second = BoundedReader::new(&mut source, 2);
        assert_eq!(second.next_byte().unwrap(), Some(4));
        assert_eq!(second.next_byte().unwrap(), Some(5));
        assert_eq!(second.next_byte().unwrap(), None);

        assert_eq!(source.position(), 6);
    }
}
