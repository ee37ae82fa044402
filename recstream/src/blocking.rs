use std::io::{self, Read};
use std::time::{Duration, Instant};

use crate::filter::FilterReader;
use crate::source::Source;

/// How long a [`BlockingReader`] keeps waiting on a source that has stalled.
///
/// A stall is a read that fails with `Interrupted` or `WouldBlock`. The
/// default waits forever, so a source that never delivers again blocks the
/// caller indefinitely; bound it here or at the transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FillPolicy {
    timeout: Option<Duration>,
    max_stalls: Option<u32>,
}

impl FillPolicy {
    /// Wait for as long as the source takes.
    pub fn unbounded() -> FillPolicy {
        FillPolicy::default()
    }

    /// Give up once a single fill has been running for longer than `timeout`.
    pub fn timeout(mut self, timeout: Duration) -> FillPolicy {
        self.timeout = Some(timeout);
        self
    }

    /// Give up after `max_stalls` stalled reads within a single fill.
    pub fn max_stalls(mut self, max_stalls: u32) -> FillPolicy {
        self.max_stalls = Some(max_stalls);
        self
    }

    /// Whether this policy never gives up.
    pub fn is_unbounded(&self) -> bool {
        self.timeout.is_none() && self.max_stalls.is_none()
    }

    fn check(&self, stalls: u32, started: Instant) -> io::Result<()> {
        if let Some(max) = self.max_stalls {
            if stalls > max {
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("source stalled {} times", stalls),
                ));
            }
        }
        if let Some(timeout) = self.timeout {
            if started.elapsed() > timeout {
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("fill did not complete within {:?}", timeout),
                ));
            }
        }
        Ok(())
    }
}

/// Fills read buffers completely unless the wrapped source ends.
///
/// Sources such as slow sockets may hand back fewer bytes than asked for.
/// This decorator pulls one byte at a time until the buffer is full or the
/// source reports end of stream, so a short result always means end of
/// stream. Everything except `read` passes straight through.
#[derive(Debug)]
pub struct BlockingReader<R> {
    inner: FilterReader<R>,
    policy: FillPolicy,
}

impl<R> BlockingReader<R> {
    /// Create a blocking reader that waits without limit.
    pub fn new(inner: R) -> BlockingReader<R> {
        BlockingReader::with_policy(inner, FillPolicy::default())
    }

    /// Create a blocking reader that gives up as `policy` says.
    pub fn with_policy(inner: R, policy: FillPolicy) -> BlockingReader<R> {
        BlockingReader {
            inner: FilterReader::new(inner),
            policy,
        }
    }

    /// Get the fill policy in use.
    pub fn policy(&self) -> FillPolicy {
        self.policy
    }

    /// Get a reference to the wrapped source.
    pub fn get_ref(&self) -> &R {
        self.inner.get_ref()
    }

    /// Consume the reader, returning the wrapped source.
    pub fn into_inner(self) -> R {
        self.inner.into_inner()
    }
}

impl<R: Read> Read for BlockingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let started = Instant::now();
        let mut stalls = 0u32;
        let mut filled = 0;

        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..filled + 1]) {
                Ok(0) => break,
                Ok(_) => filled += 1,
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
                    ) =>
                {
                    stalls += 1;
                    tracing::trace!(stalls, filled, "source stalled");
                    self.policy.check(stalls, started)?;
                    if e.kind() == io::ErrorKind::WouldBlock {
                        std::thread::yield_now();
                    }
                }
                Err(e) => return Err(e),
            }
        }

        if filled < buf.len() {
            tracing::trace!(filled, wanted = buf.len(), "end of stream before fill");
        }
        Ok(filled)
    }
}

impl<R: Source> Source for BlockingReader<R> {
    fn available(&self) -> usize {
        self.inner.available()
    }

    fn next_byte(&mut self) -> io::Result<Option<u8>> {
        self.inner.next_byte()
    }

    fn read_whole(&mut self, buf: &mut [u8]) -> io::Result<()> {
        if self.inner.available() >= buf.len() {
            return self.inner.read_whole(buf);
        }
        self.read_exact(buf)
    }

    fn mark_supported(&self) -> bool {
        self.inner.mark_supported()
    }

    fn mark(&mut self) {
        self.inner.mark()
    }

    fn reset(&mut self) -> io::Result<()> {
        self.inner.reset()
    }

    fn skip(&mut self, n: u64) -> io::Result<u64> {
        self.inner.skip(n)
    }

    fn read_plain(&mut self, buf: &mut [u8]) -> io::Result<()> {
        self.inner.read_plain(buf)
    }

    fn close(&mut self) -> io::Result<()> {
        self.inner.close()
    }
}
