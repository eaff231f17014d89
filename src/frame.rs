//! Single-frame encoding and decoding.
//!
//! A frame is one BSON document exactly as it appears on the wire: a little-endian `i32` total
//! length (which counts the 4 prefix bytes themselves), the elements, and a trailing NUL. Frames
//! are written back-to-back with no separator, so the prefix alone says where the next one
//! starts.
//!
//! ```
//! # use bson_streaming::{doc, frame};
//! let doc = doc! { "hello": "world" };
//! let bytes = frame::encode(&doc).unwrap();
//! assert_eq!(frame::declared_len(&bytes), Some(22));
//! assert_eq!(frame::decode(&bytes).unwrap(), doc);
//! ```

use crate::element::{serialize_doc, Parser};
use crate::{Document, Error, Result, MAX_DOC_SIZE};

use byteorder::{ByteOrder, LittleEndian};

/// Length of the frame prefix.
pub const PREFIX_LEN: usize = 4;

/// The smallest possible frame: a prefix and a terminator, i.e. the empty document.
pub const MIN_FRAME_LEN: usize = 5;

/// Read the declared total frame length from the start of `buf`, if at least 4 bytes are
/// present. The value is not validated.
pub fn declared_len(buf: &[u8]) -> Option<i32> {
    if buf.len() < PREFIX_LEN {
        None
    } else {
        Some(LittleEndian::read_i32(buf))
    }
}

/// Check a declared frame length against the minimum frame size and `max_len`, returning it as a
/// `usize` if it's acceptable.
pub fn check_len(declared: i32, max_len: usize) -> Result<usize> {
    if declared < MIN_FRAME_LEN as i32 {
        return Err(Error::MalformedFrame(format!(
            "Frame length {} is below the minimum of {}",
            declared, MIN_FRAME_LEN
        )));
    }
    let len = declared as usize;
    if len > max_len {
        return Err(Error::LengthTooLong {
            max: max_len,
            actual: len,
        });
    }
    Ok(len)
}

/// Encode a document into a new frame.
pub fn encode(doc: &Document) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_into(&mut buf, doc)?;
    Ok(buf)
}

/// Append one encoded frame to `buf`. If encoding fails, `buf` is left as it was, so a partial
/// frame never ends up in the output.
pub fn encode_into(buf: &mut Vec<u8>, doc: &Document) -> Result<()> {
    let start = buf.len();
    let result = serialize_doc(buf, doc, 0).and_then(|()| {
        let len = buf.len() - start;
        if len > MAX_DOC_SIZE {
            Err(Error::LengthTooLong {
                max: MAX_DOC_SIZE,
                actual: len,
            })
        } else {
            Ok(())
        }
    });
    if result.is_err() {
        buf.truncate(start);
    }
    result
}

/// Decode exactly one frame. The buffer must hold the whole frame and nothing else.
pub fn decode(buf: &[u8]) -> Result<Document> {
    let declared = declared_len(buf).ok_or_else(|| {
        Error::MalformedFrame(format!(
            "Frame of {} bytes is too short to hold a length prefix",
            buf.len()
        ))
    })?;
    let len = check_len(declared, MAX_DOC_SIZE)?;
    if len != buf.len() {
        return Err(Error::MalformedFrame(format!(
            "Frame declares {} bytes but {} were given",
            len,
            buf.len()
        )));
    }
    let mut parser = Parser::new(buf);
    let doc = parser.parse_doc(0)?;
    if parser.remaining() != 0 {
        return Err(Error::MalformedFrame(format!(
            "{} bytes left over after decoding frame",
            parser.remaining()
        )));
    }
    Ok(doc)
}
