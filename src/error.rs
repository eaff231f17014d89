use std::fmt;
use std::io;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug)]
pub enum Error {
    /// Occurs when a frame's declared length disagrees with its content: a length below the
    /// minimum, a bad terminator, a nested length running past its parent, and the like. The
    /// stream cannot be resynchronized after this.
    MalformedFrame(String),
    /// The byte source ended while a partial frame was still buffered. `expected` is the declared
    /// frame length, if enough bytes arrived to read it.
    TruncatedStream {
        buffered: usize,
        expected: Option<usize>,
    },
    /// An element type tag outside the supported value set was found on decode, or a value that
    /// can't be represented (such as a field name holding a NUL byte) was given to the encoder.
    UnsupportedValue(String),
    /// Document was greater than the maximum allowed size on encode or decode.
    LengthTooLong { max: usize, actual: usize },
    /// Decoding hit some parsing limit, like the nesting depth.
    ParseLimit(String),
    /// A document had no `_id` field where a key was required.
    MissingKey,
    /// A document looked like an update description but wasn't a valid one.
    InvalidUpdate(String),
    /// Reading from the byte source failed.
    Source(io::Error),
    /// The output sink rejected a write. Never retried.
    Sink(io::Error),
    /// A user-supplied map or reduce function failed.
    User(anyhow::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::MalformedFrame(ref err) => write!(f, "Malformed frame: {}", err),
            Error::TruncatedStream {
                buffered,
                expected: Some(expected),
            } => write!(
                f,
                "Stream ended mid-frame: frame declared {} bytes, but only {} arrived",
                expected, buffered
            ),
            Error::TruncatedStream {
                buffered,
                expected: None,
            } => write!(
                f,
                "Stream ended mid-frame: {} bytes left over, not enough for a length prefix",
                buffered
            ),
            Error::UnsupportedValue(ref err) => write!(f, "Unsupported value: {}", err),
            Error::LengthTooLong { max, actual } => write!(
                f,
                "Data too long: was {} bytes, maximum allowed is {}",
                actual, max
            ),
            Error::ParseLimit(ref err) => write!(f, "Hit parsing limit: {}", err),
            Error::MissingKey => f.write_str("Document has no `_id` field to use as its key"),
            Error::InvalidUpdate(ref err) => write!(f, "Invalid update description: {}", err),
            Error::Source(ref err) => write!(f, "Failed reading input: {}", err),
            Error::Sink(ref err) => write!(f, "Failed writing output: {}", err),
            Error::User(ref err) => write!(f, "User function failed: {:#}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            Error::Source(ref err) => Some(err),
            Error::Sink(ref err) => Some(err),
            Error::User(ref err) => Some(&**err),
            _ => None,
        }
    }
}

impl std::convert::From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Self::User(e)
    }
}
