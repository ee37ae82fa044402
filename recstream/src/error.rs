use std::io;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unexpected end of input: needed {needed} bytes, {available} available")]
    EndOfInput { needed: usize, available: usize },

    #[error("I/O failure")]
    Io(#[from] io::Error),

    #[error("Output does not support seeking, cannot reserve delayed output")]
    NonSeekableOutput(#[source] io::Error),

    #[error("Buffer overrun: needed {needed} bytes, {remaining} remaining")]
    BufferOverrun { needed: usize, remaining: usize },

    #[error("Delayed slot expected {expected} bytes, {written} were written")]
    SlotLength { expected: usize, written: usize },

    #[error("Delayed slot was not issued by this output")]
    ForeignSlot,
}

impl Error {
    pub(crate) fn end_of_input(needed: usize, available: usize) -> Error {
        Error::EndOfInput { needed, available }
    }

    /// Map a failed `read_exact` onto the codec taxonomy.
    pub(crate) fn from_read(e: io::Error, needed: usize, available: usize) -> Error {
        match e.kind() {
            io::ErrorKind::UnexpectedEof => Error::end_of_input(needed, available),
            _ => Error::Io(e),
        }
    }
}

impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Io(e) => e,
            Error::EndOfInput { .. } => io::Error::new(io::ErrorKind::UnexpectedEof, e),
            Error::NonSeekableOutput(_) => io::Error::new(io::ErrorKind::Unsupported, e),
            Error::BufferOverrun { .. } => io::Error::new(io::ErrorKind::WriteZero, e),
            Error::SlotLength { .. } | Error::ForeignSlot => {
                io::Error::new(io::ErrorKind::InvalidInput, e)
            }
        }
    }
}
