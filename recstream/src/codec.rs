//! The little-endian field codec.
//!
//! [`LittleEndianInput`] and [`LittleEndianOutput`] are the contract record
//! parsers and writers are written against. Multi-byte values are always
//! least-significant byte first, whatever the host byte order, and a scalar is
//! either read whole or not at all: running out of bytes is
//! [`Error::EndOfInput`], never a truncated value.

use std::io::Write;

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};

use crate::error::{Error, Result};
use crate::filter::FilterWriter;
use crate::source::{ByteSource, Source};

pub trait LittleEndianInput {
    /// Bytes readable without blocking or failing. Does not move the position.
    fn available(&self) -> usize;

    /// Fills `buf` completely, or fails with [`Error::EndOfInput`].
    fn read_fully(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Like [`LittleEndianInput::read_fully`], but asks for the bytes as
    /// stored, skipping any decryption the source applies.
    fn read_plain(&mut self, buf: &mut [u8]) -> Result<()> {
        self.read_fully(buf)
    }

    fn read_ubyte(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_fully(&mut buf)?;
        Ok(buf[0])
    }

    fn read_byte(&mut self) -> Result<i8> {
        Ok(self.read_ubyte()? as i8)
    }

    fn read_ushort(&mut self) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.read_fully(&mut buf)?;
        Ok(LittleEndian::read_u16(&buf))
    }

    fn read_short(&mut self) -> Result<i16> {
        Ok(self.read_ushort()? as i16)
    }

    fn read_uint(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_fully(&mut buf)?;
        Ok(LittleEndian::read_u32(&buf))
    }

    fn read_int(&mut self) -> Result<i32> {
        Ok(self.read_uint()? as i32)
    }

    fn read_long(&mut self) -> Result<i64> {
        let mut buf = [0u8; 8];
        self.read_fully(&mut buf)?;
        Ok(LittleEndian::read_i64(&buf))
    }

    fn read_float(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.read_uint()?))
    }

    /// Reads eight bytes and reinterprets them as an IEEE-754 binary64.
    fn read_double(&mut self) -> Result<f64> {
        Ok(f64::from_bits(self.read_long()? as u64))
    }
}

pub trait LittleEndianOutput {
    fn write_byte(&mut self, value: u8) -> Result<()>;

    fn write_bytes(&mut self, buf: &[u8]) -> Result<()>;

    fn write_short(&mut self, value: i16) -> Result<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    fn write_ushort(&mut self, value: u16) -> Result<()> {
        self.write_short(value as i16)
    }

    fn write_int(&mut self, value: i32) -> Result<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    fn write_uint(&mut self, value: u32) -> Result<()> {
        self.write_int(value as i32)
    }

    /// Written as the low 32 bits followed by the high 32 bits.
    fn write_long(&mut self, value: i64) -> Result<()> {
        self.write_int(value as i32)?;
        self.write_int((value >> 32) as i32)
    }

    fn write_float(&mut self, value: f32) -> Result<()> {
        self.write_int(value.to_bits() as i32)
    }

    fn write_double(&mut self, value: f64) -> Result<()> {
        self.write_long(value.to_bits() as i64)
    }
}

impl<B: AsRef<[u8]>> LittleEndianInput for ByteSource<B> {
    #[inline(always)]
    fn available(&self) -> usize {
        self.remaining()
    }

    fn read_fully(&mut self, buf: &mut [u8]) -> Result<()> {
        buf.copy_from_slice(self.take_slice(buf.len())?);
        Ok(())
    }

    fn read_ushort(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.take_slice(2)?))
    }

    fn read_uint(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.take_slice(4)?))
    }

    fn read_long(&mut self) -> Result<i64> {
        Ok(LittleEndian::read_i64(self.take_slice(8)?))
    }
}

/// Drives the codec over any [`Source`].
///
/// Short reads surface as [`Error::EndOfInput`]; any other failure of the
/// wrapped source is passed up as [`Error::Io`]. Put a
/// [`BlockingReader`](crate::BlockingReader) underneath when the source may
/// deliver partial chunks.
#[derive(Debug)]
pub struct LittleEndianReader<R> {
    inner: R,
}

impl<R: Source> LittleEndianReader<R> {
    /// Wrap `inner` in a new reader.
    pub fn new(inner: R) -> LittleEndianReader<R> {
        LittleEndianReader { inner }
    }

    /// Get a reference to the wrapped source.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Get a mutable reference to the wrapped source.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Consume the reader, returning the wrapped source.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Skips `n` bytes, failing if the source ends first.
    pub fn skip_fully(&mut self, n: u64) -> Result<()> {
        let available = self.inner.available();
        let skipped = self.inner.skip(n)?;
        if skipped < n {
            return Err(Error::end_of_input(n as usize, available));
        }
        Ok(())
    }

    #[inline(always)]
    fn fill(&mut self, buf: &mut [u8]) -> Result<()> {
        let (needed, available) = (buf.len(), self.inner.available());
        self.inner
            .read_whole(buf)
            .map_err(|e| Error::from_read(e, needed, available))
    }

    #[inline(always)]
    fn scalar<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.fill(&mut buf)?;
        Ok(buf)
    }
}

impl<R: Source> LittleEndianInput for LittleEndianReader<R> {
    fn available(&self) -> usize {
        self.inner.available()
    }

    fn read_fully(&mut self, buf: &mut [u8]) -> Result<()> {
        self.fill(buf)
    }

    fn read_plain(&mut self, buf: &mut [u8]) -> Result<()> {
        let (needed, available) = (buf.len(), self.inner.available());
        self.inner
            .read_plain(buf)
            .map_err(|e| Error::from_read(e, needed, available))
    }

    fn read_ubyte(&mut self) -> Result<u8> {
        let [byte] = self.scalar::<1>()?;
        Ok(byte)
    }

    fn read_ushort(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(&self.scalar::<2>()?))
    }

    fn read_short(&mut self) -> Result<i16> {
        Ok(LittleEndian::read_i16(&self.scalar::<2>()?))
    }

    fn read_uint(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(&self.scalar::<4>()?))
    }

    fn read_int(&mut self) -> Result<i32> {
        Ok(LittleEndian::read_i32(&self.scalar::<4>()?))
    }

    fn read_long(&mut self) -> Result<i64> {
        Ok(LittleEndian::read_i64(&self.scalar::<8>()?))
    }

    fn read_double(&mut self) -> Result<f64> {
        Ok(LittleEndian::read_f64(&self.scalar::<8>()?))
    }
}

/// Drives the codec over any [`Write`] sink.
///
/// A failed write leaves the sink at an unknown position; treat it as the end
/// of the whole output operation.
#[derive(Debug)]
pub struct LittleEndianWriter<W> {
    out: FilterWriter<W>,
    written: u64,
}

impl<W: Write> LittleEndianWriter<W> {
    /// Wrap `out` in a new writer.
    pub fn new(out: W) -> LittleEndianWriter<W> {
        LittleEndianWriter {
            out: FilterWriter::new(out),
            written: 0,
        }
    }

    /// Bytes written through this writer so far.
    #[inline(always)]
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Get a reference to the wrapped sink.
    pub fn get_ref(&self) -> &W {
        self.out.get_ref()
    }

    /// Get a mutable reference to the wrapped sink.
    pub fn get_mut(&mut self) -> &mut W {
        self.out.get_mut()
    }

    /// Flush the wrapped sink.
    pub fn flush(&mut self) -> Result<()> {
        Ok(self.out.flush()?)
    }

    /// Flushes and refuses further writes.
    pub fn close(&mut self) -> Result<()> {
        Ok(self.out.close()?)
    }

    /// Consume the writer, returning the wrapped sink.
    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

impl<W: Write> LittleEndianOutput for LittleEndianWriter<W> {
    fn write_byte(&mut self, value: u8) -> Result<()> {
        self.out.write_u8(value)?;
        self.written += 1;
        Ok(())
    }

    fn write_bytes(&mut self, buf: &[u8]) -> Result<()> {
        self.out.write_all(buf)?;
        self.written += buf.len() as u64;
        Ok(())
    }

    fn write_short(&mut self, value: i16) -> Result<()> {
        self.out.write_i16::<LittleEndian>(value)?;
        self.written += 2;
        Ok(())
    }

    fn write_int(&mut self, value: i32) -> Result<()> {
        self.out.write_i32::<LittleEndian>(value)?;
        self.written += 4;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{LittleEndianInput, LittleEndianOutput, LittleEndianReader, LittleEndianWriter};
    use crate::error::{Error, Result};
    use crate::{BoundedReader, ByteSource};
    use std::io::Cursor;

    fn encode(f: impl FnOnce(&mut LittleEndianWriter<Vec<u8>>) -> Result<()>) -> Vec<u8> {
        let mut writer = LittleEndianWriter::new(Vec::new());
        f(&mut writer).unwrap();
        writer.into_inner()
    }

    #[test]
    fn int_byte_order() {
        assert_eq!(
            encode(|w| w.write_int(0x0403_0201)),
            vec![0x01, 0x02, 0x03, 0x04]
        );
        assert_eq!(encode(|w| w.write_short(0x0201)), vec![0x01, 0x02]);
    }

    #[test]
    fn long_is_low_int_then_high_int() {
        let bytes = encode(|w| w.write_long(0x0807_0605_0403_0201));
        assert_eq!(bytes, vec![1, 2, 3, 4, 5, 6, 7, 8]);

        let bytes = encode(|w| w.write_long(-2));
        assert_eq!(bytes, vec![0xfe, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]);
    }

    #[test]
    fn scalars_survive_the_trip() {
        let bytes = encode(|w| {
            w.write_byte(0x80)?;
            w.write_short(i16::MIN)?;
            w.write_ushort(0xfffe)?;
            w.write_int(-123_456)?;
            w.write_uint(u32::MAX)?;
            w.write_long(i64::MIN + 7)?;
            w.write_float(1.5)?;
            w.write_double(std::f64::consts::PI)?;
            w.write_bytes(b"tail")
        });
        assert_eq!(bytes.len(), 1 + 2 + 2 + 4 + 4 + 8 + 4 + 8 + 4);

        fn check(input: &mut dyn LittleEndianInput) {
            assert_eq!(input.read_byte().unwrap(), -128);
            assert_eq!(input.read_short().unwrap(), i16::MIN);
            assert_eq!(input.read_ushort().unwrap(), 0xfffe);
            assert_eq!(input.read_int().unwrap(), -123_456);
            assert_eq!(input.read_uint().unwrap(), u32::MAX);
            assert_eq!(input.read_long().unwrap(), i64::MIN + 7);
            assert_eq!(input.read_float().unwrap(), 1.5);
            assert_eq!(
                input.read_double().unwrap().to_bits(),
                std::f64::consts::PI.to_bits()
            );
            let mut tail = [0u8; 4];
            input.read_fully(&mut tail).unwrap();
            assert_eq!(&tail, b"tail");
            assert_eq!(input.available(), 0);
        }

        check(&mut ByteSource::new(&bytes[..]));
        check(&mut LittleEndianReader::new(&bytes[..]));
    }

    #[test]
    fn unsigned_byte_is_widened() {
        let mut source = ByteSource::new(vec![0xffu8, 0xff]);
        assert_eq!(source.read_ubyte().unwrap(), 255);
        assert_eq!(source.read_byte().unwrap(), -1);
    }

    #[test]
    fn double_bits_are_preserved() {
        let nan = f64::from_bits(0x7ff4_0000_0000_0001);
        let bytes = encode(|w| w.write_double(nan));
        let mut source = ByteSource::new(bytes);
        assert_eq!(source.read_double().unwrap().to_bits(), nan.to_bits());
    }

    #[test]
    fn short_scalar_leaves_position() {
        let mut source = ByteSource::new(vec![1u8, 2, 3]);
        assert!(matches!(
            source.read_int(),
            Err(Error::EndOfInput {
                needed: 4,
                available: 3
            })
        ));
        assert_eq!(source.position(), 0);
        assert_eq!(source.read_ushort().unwrap(), 0x0201);
    }

    #[test]
    fn short_scalar_over_slice_consumes_nothing() {
        let mut reader = LittleEndianReader::new(&[1u8, 2, 3][..]);
        assert!(matches!(
            reader.read_int(),
            Err(Error::EndOfInput {
                needed: 4,
                available: 3
            })
        ));
        assert_eq!(reader.available(), 3);
        assert_eq!(reader.read_ushort().unwrap(), 0x0201);
        assert_eq!(reader.read_ubyte().unwrap(), 3);
    }

    #[test]
    fn short_scalar_over_cursor_consumes_nothing() {
        let mut reader = LittleEndianReader::new(Cursor::new(vec![1u8, 2, 3]));
        assert!(reader.read_long().is_err());
        assert_eq!(reader.get_ref().position(), 0);
        let mut buf = [0u8; 4];
        assert!(reader.read_fully(&mut buf).is_err());
        assert_eq!(reader.get_ref().position(), 0);
        assert_eq!(reader.read_short().unwrap(), 0x0201);
        assert_eq!(reader.get_ref().position(), 2);
    }

    #[test]
    fn short_scalar_over_bounded_slice_keeps_count() {
        let data = [0x11u8; 3];
        let mut reader = LittleEndianReader::new(BoundedReader::new(&data[..], 8));
        assert!(reader.read_long().is_err());
        assert_eq!(reader.get_ref().consumed(), 0);
        assert_eq!(reader.available(), 3);
        assert_eq!(reader.read_ubyte().unwrap(), 0x11);
        assert_eq!(reader.get_ref().consumed(), 1);
    }

    #[test]
    fn bounded_reader_ends_scalars_at_bound() {
        let data = [0xaau8; 16];
        let mut reader = LittleEndianReader::new(BoundedReader::new(&data[..], 6));
        reader.read_int().unwrap();
        assert!(matches!(
            reader.read_int(),
            Err(Error::EndOfInput {
                needed: 4,
                available: 2
            })
        ));
        assert_eq!(reader.get_ref().consumed(), 4);
        assert_eq!(reader.read_short().unwrap(), 0xaaaau16 as i16);
    }

    #[test]
    fn skip_fully() {
        let data = [0u8; 10];
        let mut reader = LittleEndianReader::new(&data[..]);
        reader.skip_fully(7).unwrap();
        assert_eq!(reader.available(), 3);
        assert!(matches!(
            reader.skip_fully(4),
            Err(Error::EndOfInput { .. })
        ));
    }

    #[test]
    fn writer_counts_and_closes() {
        let mut writer = LittleEndianWriter::new(Vec::new());
        writer.write_long(1).unwrap();
        writer.write_byte(2).unwrap();
        assert_eq!(writer.written(), 9);
        writer.close().unwrap();
        assert!(matches!(writer.write_byte(3), Err(Error::Io(_))));
        assert_eq!(writer.into_inner().len(), 9);
    }
}
