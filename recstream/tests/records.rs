//! Composes the decorators the way a record-oriented container reader and
//! writer do.
//!
//! The layout used throughout is a run of records, each a `u16` type, a `u32`
//! body length, then the body.

use std::io::{self, Read};

use recstream::{
    BlockingReader, BoundedReader, ByteArrayWriter, ByteSource, DelayableOutput,
    LittleEndianInput, LittleEndianOutput, LittleEndianReader, PatchableWriter, Result,
};
use tempfile::TempDir;

const HEADER_LEN: u64 = 6;

#[derive(Debug, PartialEq)]
enum Record {
    Number { value: i64, scale: f64 },
    Text(Vec<u8>),
}

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn write_record<O: DelayableOutput>(out: &mut O, record: &Record) -> Result<()> {
    match record {
        Record::Number { value, scale } => {
            out.write_ushort(1)?;
            let len = out.reserve(4)?;
            out.write_long(*value)?;
            out.write_double(*scale)?;
            out.materialize(len, |w| w.write_uint(16))
        }
        Record::Text(text) => {
            out.write_ushort(2)?;
            let len = out.reserve(4)?;
            out.write_bytes(text)?;
            let text_len = text.len() as u32;
            out.materialize(len, |w| w.write_uint(text_len))
        }
    }
}

fn read_record<I: LittleEndianInput>(kind: u16, body: &mut I) -> Result<Record> {
    Ok(match kind {
        1 => Record::Number {
            value: body.read_long()?,
            scale: body.read_double()?,
        },
        _ => {
            let mut text = vec![0u8; body.available()];
            body.read_fully(&mut text)?;
            Record::Text(text)
        }
    })
}

fn read_all<B: AsRef<[u8]>>(mut source: ByteSource<B>) -> Result<Vec<Record>> {
    let mut records = Vec::new();
    while source.remaining() > 0 {
        let (kind, len) = {
            let mut header = LittleEndianReader::new(BoundedReader::new(&mut source, HEADER_LEN));
            (header.read_ushort()?, header.read_uint()?)
        };

        let mut body = LittleEndianReader::new(BoundedReader::new(&mut source, len as u64));
        records.push(read_record(kind, &mut body)?);
    }
    Ok(records)
}

fn sample() -> Vec<Record> {
    vec![
        Record::Number {
            value: -0x0102_0304_0506_0708,
            scale: 0.25,
        },
        Record::Text(b"compound".to_vec()),
        Record::Text(Vec::new()),
        Record::Number {
            value: i64::MAX,
            scale: f64::MIN_POSITIVE,
        },
    ]
}

#[test]
fn records_through_a_byte_array() {
    init_logging();

    let mut out = ByteArrayWriter::new(vec![0u8; 256]);
    for record in &sample() {
        write_record(&mut out, record).unwrap();
    }
    assert_eq!(out.outstanding(), 0);

    let written = out.as_written().to_vec();
    assert_eq!(&written[..6], &[1, 0, 16, 0, 0, 0]);
    assert_eq!(read_all(ByteSource::new(written)).unwrap(), sample());
}

#[cfg(feature = "mmap")]
#[test]
fn records_through_a_file() {
    init_logging();

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("records.bin");

    let file = std::fs::File::create(&path).unwrap();
    let mut out = PatchableWriter::new(file).unwrap();
    for record in &sample() {
        write_record(&mut out, record).unwrap();
    }
    out.finish().unwrap();

    let file = std::fs::File::open(&path).unwrap();
    let source = unsafe { ByteSource::map(&file) }.unwrap();
    assert_eq!(read_all(source).unwrap(), sample());
}

#[test]
fn body_reader_cannot_run_into_next_record() {
    let mut out = ByteArrayWriter::new(vec![0u8; 64]);
    write_record(&mut out, &Record::Text(b"ab".to_vec())).unwrap();
    write_record(&mut out, &Record::Text(b"cd".to_vec())).unwrap();
    let mut source = ByteSource::new(out.as_written().to_vec());

    source.read_exact(&mut [0u8; HEADER_LEN as usize]).unwrap();
    let mut body = LittleEndianReader::new(BoundedReader::new(&mut source, 2));
    assert_eq!(body.read_ushort().unwrap(), u16::from_le_bytes(*b"ab"));
    assert!(body.read_ubyte().is_err());
    drop(body);

    assert_eq!(source.position(), 8);
    let mut next = [0u8; 2];
    source.read_exact(&mut next).unwrap();
    assert_eq!(next, [2, 0]);
}

/// A transport that never returns more than `chunk` bytes per read.
struct Chunked<'a> {
    data: &'a [u8],
    chunk: usize,
}

impl Read for Chunked<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = buf.len().min(self.chunk);
        self.data.read(&mut buf[..len])
    }
}

impl recstream::Source for Chunked<'_> {
    fn available(&self) -> usize {
        self.data.len().min(self.chunk)
    }
}

#[test]
fn blocking_reader_under_the_codec() {
    let mut out = ByteArrayWriter::new(vec![0u8; 128]);
    for record in &sample() {
        write_record(&mut out, record).unwrap();
    }
    let bytes = out.as_written().to_vec();

    let transport = Chunked {
        data: &bytes,
        chunk: 3,
    };
    let mut reader = BlockingReader::new(transport);

    let mut head = [0u8; 30];
    assert_eq!(reader.read(&mut head).unwrap(), 30);
    assert_eq!(&head[..], &bytes[..30]);

    let mut rest = vec![0u8; bytes.len()];
    let tail = reader.read(&mut rest).unwrap();
    assert_eq!(tail, bytes.len() - 30);
    assert_eq!(&rest[..tail], &bytes[30..]);
    assert_eq!(reader.read(&mut rest).unwrap(), 0);
}

#[test]
fn blocking_reader_feeds_bounded_records() {
    let mut out = ByteArrayWriter::new(vec![0u8; 128]);
    write_record(&mut out, &sample()[0]).unwrap();
    let bytes = out.as_written().to_vec();

    let mut transport = BlockingReader::new(Chunked {
        data: &bytes,
        chunk: 1,
    });

    let view = BoundedReader::new(&mut transport, HEADER_LEN).propagate_close(false);
    let mut header = LittleEndianReader::new(view);
    assert_eq!(header.read_ushort().unwrap(), 1);
    let len = header.read_uint().unwrap();
    drop(header);

    let mut body = LittleEndianReader::new(BoundedReader::new(&mut transport, len as u64));
    assert_eq!(read_record(1, &mut body).unwrap(), sample()[0]);
}
