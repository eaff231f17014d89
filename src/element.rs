use crate::marker::ElementType;
use crate::{
    error::{Error, Result},
    value::Binary,
    DateTime, Document, ObjectId, Value, MAX_DEPTH,
};

use byteorder::{LittleEndian, ReadBytesExt};

/// Serialize a whole document body, including its own length prefix and terminator, onto a byte
/// vector. On error the vector may hold a partial document; callers that care must truncate it.
pub fn serialize_doc(buf: &mut Vec<u8>, doc: &Document, depth: usize) -> Result<()> {
    serialize_fields(buf, doc.iter(), depth)
}

fn serialize_fields<'a, I>(buf: &mut Vec<u8>, fields: I, depth: usize) -> Result<()>
where
    I: Iterator<Item = (&'a str, &'a Value)>,
{
    if depth > MAX_DEPTH {
        return Err(Error::ParseLimit("Depth limit exceeded".to_string()));
    }
    let start = buf.len();
    buf.extend_from_slice(&[0u8; 4]);
    for (key, val) in fields {
        buf.push(val.element_type().into());
        serialize_cstr(buf, key)?;
        serialize_elem(buf, val, depth)?;
    }
    buf.push(0);
    let len = buf.len() - start;
    let len = i32::try_from(len).map_err(|_| Error::LengthTooLong {
        max: i32::MAX as usize,
        actual: len,
    })?;
    buf[start..start + 4].copy_from_slice(&len.to_le_bytes());
    Ok(())
}

fn serialize_cstr(buf: &mut Vec<u8>, key: &str) -> Result<()> {
    if key.as_bytes().contains(&0) {
        return Err(Error::UnsupportedValue(format!(
            "Field name {:?} contains a NUL byte",
            key
        )));
    }
    buf.extend_from_slice(key.as_bytes());
    buf.push(0);
    Ok(())
}

fn length_prefix(len: usize) -> Result<[u8; 4]> {
    i32::try_from(len)
        .map(i32::to_le_bytes)
        .map_err(|_| Error::LengthTooLong {
            max: i32::MAX as usize,
            actual: len,
        })
}

/// Serialize one element's value (without its type tag or field name).
fn serialize_elem(buf: &mut Vec<u8>, val: &Value, depth: usize) -> Result<()> {
    match val {
        Value::Null => (),
        Value::Bool(v) => buf.push(*v as u8),
        Value::Int32(v) => buf.extend_from_slice(&v.to_le_bytes()),
        Value::Int64(v) => buf.extend_from_slice(&v.to_le_bytes()),
        Value::Double(v) => buf.extend_from_slice(&v.to_bits().to_le_bytes()),
        Value::Str(v) => {
            buf.extend_from_slice(&length_prefix(v.len() + 1)?);
            buf.extend_from_slice(v.as_bytes());
            buf.push(0);
        }
        Value::Binary(v) => {
            buf.extend_from_slice(&length_prefix(v.bytes.len())?);
            buf.push(v.subtype);
            buf.extend_from_slice(&v.bytes);
        }
        Value::ObjectId(v) => buf.extend_from_slice(v.as_ref()),
        Value::DateTime(v) => buf.extend_from_slice(&v.timestamp_millis().to_le_bytes()),
        Value::Document(v) => serialize_doc(buf, v, depth + 1)?,
        Value::Array(v) => {
            let keys: Vec<String> = (0..v.len()).map(|i| i.to_string()).collect();
            serialize_fields(
                buf,
                keys.iter().map(String::as_str).zip(v.iter()),
                depth + 1,
            )?
        }
    }
    Ok(())
}

fn too_short(step: &'static str, actual: usize, expected: usize) -> Error {
    Error::MalformedFrame(format!(
        "Expected {} bytes, but only {} remain inside the frame on step [{}]",
        expected, actual, step
    ))
}

/// Pulls documents and their elements out of a byte slice. Every length it reads is checked
/// against the bytes remaining, so a lying length prefix can't read past the slice.
#[derive(Clone, Debug)]
pub struct Parser<'a> {
    data: &'a [u8],
}

impl<'a> Parser<'a> {
    pub fn new(data: &'a [u8]) -> Parser<'a> {
        Self { data }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len()
    }

    /// Parse one length-prefixed document.
    pub fn parse_doc(&mut self, depth: usize) -> Result<Document> {
        let mut doc = Document::new();
        self.parse_fields(depth, |key, val| {
            doc.insert(key, val);
            Ok(())
        })?;
        Ok(doc)
    }

    // Arrays are encoded as documents whose keys are "0", "1", ... in order.
    fn parse_array(&mut self, depth: usize) -> Result<Vec<Value>> {
        let mut array = Vec::new();
        self.parse_fields(depth, |key, val| {
            if key.parse::<usize>().ok() != Some(array.len()) {
                return Err(Error::MalformedFrame(format!(
                    "Array key {:?} out of sequence, expected \"{}\"",
                    key,
                    array.len()
                )));
            }
            array.push(val);
            Ok(())
        })?;
        Ok(array)
    }

    fn parse_fields<F>(&mut self, depth: usize, mut field: F) -> Result<()>
    where
        F: FnMut(&'a str, Value) -> Result<()>,
    {
        if depth > MAX_DEPTH {
            return Err(Error::ParseLimit("Depth limit exceeded".to_string()));
        }
        let available = self.data.len();
        let len = self
            .data
            .read_i32::<LittleEndian>()
            .map_err(|_| too_short("decode document length", available, 4))?;
        if len < 5 {
            return Err(Error::MalformedFrame(format!(
                "Document length {} is below the minimum of 5",
                len
            )));
        }
        let body_len = len as usize - 4;
        if body_len > self.data.len() {
            return Err(too_short("get document body", self.data.len(), body_len));
        }
        let (body, rest) = self.data.split_at(body_len);
        self.data = rest;

        let (&terminator, elements) = body.split_last().ok_or_else(|| {
            Error::MalformedFrame("Document body is empty".to_string())
        })?;
        if terminator != 0 {
            return Err(Error::MalformedFrame(format!(
                "Document must end with a NUL byte, found 0x{:02x}",
                terminator
            )));
        }
        let mut inner = Parser::new(elements);
        while !inner.data.is_empty() {
            let (key, val) = inner.parse_element(depth)?;
            field(key, val)?;
        }
        Ok(())
    }

    fn parse_cstr(&mut self) -> Result<&'a str> {
        let end = self
            .data
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| Error::MalformedFrame("Field name is not NUL-terminated".to_string()))?;
        let (raw, rest) = self.data.split_at(end);
        self.data = &rest[1..];
        std::str::from_utf8(raw)
            .map_err(|e| Error::MalformedFrame(format!("Field name is not valid UTF-8: {}", e)))
    }

    fn take(&mut self, len: usize, step: &'static str) -> Result<&'a [u8]> {
        if len > self.data.len() {
            return Err(too_short(step, self.data.len(), len));
        }
        let (bytes, rest) = self.data.split_at(len);
        self.data = rest;
        Ok(bytes)
    }

    fn parse_len(&mut self, step: &'static str) -> Result<usize> {
        let available = self.data.len();
        let len = self
            .data
            .read_i32::<LittleEndian>()
            .map_err(|_| too_short(step, available, 4))?;
        usize::try_from(len)
            .map_err(|_| Error::MalformedFrame(format!("Negative length {} on step [{}]", len, step)))
    }

    /// Parse a type tag, field name, and value.
    fn parse_element(&mut self, depth: usize) -> Result<(&'a str, Value)> {
        let tag = self.data[0];
        self.data = &self.data[1..];
        let key = self.parse_cstr()?;
        let elem_type = ElementType::from_u8(tag);
        let available = self.data.len();
        let val = match elem_type {
            ElementType::Unsupported(tag) => {
                return Err(Error::UnsupportedValue(format!(
                    "Element type 0x{:02x} in field {:?} is not supported",
                    tag, key
                )))
            }
            ElementType::Null => Value::Null,
            ElementType::Boolean => match self.take(1, "decode Boolean")?[0] {
                0 => Value::Bool(false),
                1 => Value::Bool(true),
                v => {
                    return Err(Error::MalformedFrame(format!(
                        "Boolean field {:?} has byte 0x{:02x}, must be 0 or 1",
                        key, v
                    )))
                }
            },
            ElementType::Int32 => Value::Int32(
                self.data
                    .read_i32::<LittleEndian>()
                    .map_err(|_| too_short("decode Int32", available, 4))?,
            ),
            ElementType::Int64 => Value::Int64(
                self.data
                    .read_i64::<LittleEndian>()
                    .map_err(|_| too_short("decode Int64", available, 8))?,
            ),
            ElementType::Double => Value::Double(
                self.data
                    .read_f64::<LittleEndian>()
                    .map_err(|_| too_short("decode Double", available, 8))?,
            ),
            ElementType::DateTime => Value::DateTime(DateTime::from_millis(
                self.data
                    .read_i64::<LittleEndian>()
                    .map_err(|_| too_short("decode DateTime", available, 8))?,
            )),
            ElementType::ObjectId => {
                let bytes = self.take(12, "decode ObjectId")?;
                Value::ObjectId(ObjectId::try_from(bytes).map_err(Error::MalformedFrame)?)
            }
            ElementType::String => {
                let len = self.parse_len("decode String length")?;
                if len == 0 {
                    return Err(Error::MalformedFrame(format!(
                        "String field {:?} has length 0, must include its terminator",
                        key
                    )));
                }
                let raw = self.take(len, "get String content")?;
                let (&terminator, raw) = raw.split_last().ok_or_else(|| {
                    Error::MalformedFrame("String content is empty".to_string())
                })?;
                if terminator != 0 {
                    return Err(Error::MalformedFrame(format!(
                        "String field {:?} is not NUL-terminated",
                        key
                    )));
                }
                let s = std::str::from_utf8(raw).map_err(|e| {
                    Error::MalformedFrame(format!("String field {:?} is not valid UTF-8: {}", key, e))
                })?;
                Value::Str(s.to_string())
            }
            ElementType::Binary => {
                let len = self.parse_len("decode Binary length")?;
                let subtype = self.take(1, "decode Binary subtype")?[0];
                let bytes = self.take(len, "get Binary content")?;
                Value::Binary(Binary::with_subtype(subtype, bytes.to_vec()))
            }
            ElementType::Document => Value::Document(self.parse_doc(depth + 1)?),
            ElementType::Array => Value::Array(self.parse_array(depth + 1)?),
        };
        Ok((key, val))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn encode(doc: &Document) -> Vec<u8> {
        let mut enc = Vec::new();
        serialize_doc(&mut enc, doc, 0).unwrap();
        enc
    }

    fn roundtrip(doc: Document) {
        let enc = encode(&doc);
        let mut parser = Parser::new(&enc);
        let dec = parser.parse_doc(0).unwrap();
        assert_eq!(parser.remaining(), 0);
        assert_eq!(dec, doc);
    }

    #[test]
    fn empty() {
        let enc = encode(&Document::new());
        assert_eq!(enc, &[5, 0, 0, 0, 0]);
        roundtrip(Document::new());
    }

    #[test]
    fn hello_world_bytes() {
        let enc = encode(&doc! { "hello": "world" });
        assert_eq!(
            enc,
            b"\x16\x00\x00\x00\x02hello\x00\x06\x00\x00\x00world\x00\x00".as_ref()
        );
    }

    #[test]
    fn array_bytes() {
        let array: Value = vec![Value::from("awesome"), Value::from(5.05), Value::from(1986)]
            .into_iter()
            .collect();
        let enc = encode(&doc! { "BSON": array.clone() });
        let expected: &[u8] = b"\x31\x00\x00\x00\x04BSON\x00\x26\x00\x00\x00\x020\x00\x08\x00\x00\x00awesome\x00\x011\x00\x33\x33\x33\x33\x33\x33\x14\x40\x102\x00\xc2\x07\x00\x00\x00\x00";
        assert_eq!(enc, expected);
        roundtrip(doc! { "BSON": array });
    }

    mod scalars {
        use super::*;

        #[test]
        fn null_and_bool() {
            let enc = encode(&doc! { "n": (), "t": true, "f": false });
            assert_eq!(
                enc,
                b"\x10\x00\x00\x00\x0an\x00\x08t\x00\x01\x08f\x00\x00\x00".as_ref()
            );
            roundtrip(doc! { "n": (), "t": true, "f": false });
        }

        #[test]
        fn integers() {
            for v in [0, 1, -1, i32::MIN, i32::MAX] {
                roundtrip(doc! { "i": v });
            }
            for v in [0, 1, -1, i64::MIN, i64::MAX] {
                roundtrip(doc! { "i": v });
            }
            let enc = encode(&doc! { "i": 1i64 });
            assert_eq!(enc[4], 0x12);
            let enc = encode(&doc! { "i": 1 });
            assert_eq!(enc[4], 0x10);
        }

        #[test]
        fn doubles() {
            for v in [0.0, -0.0, 3.2, f64::MAX, f64::MIN_POSITIVE, f64::INFINITY] {
                roundtrip(doc! { "d": v });
            }
            // NaN isn't equal to itself, so check the bits
            let enc = encode(&doc! { "d": f64::NAN });
            let dec = Parser::new(&enc).parse_doc(0).unwrap();
            assert!(dec.get_f64("d").unwrap().is_nan());
        }

        #[test]
        fn strings() {
            roundtrip(doc! { "s": "" });
            roundtrip(doc! { "s": "emoji \u{1f980} and accents \u{e9}" });
            roundtrip(doc! { "s": "inner\u{0}nul" });
            roundtrip(doc! { "s": "x".repeat(70_000) });
        }

        #[test]
        fn binary() {
            roundtrip(doc! { "b": vec![1u8, 2, 3] });
            roundtrip(doc! { "b": Binary::with_subtype(0x04, vec![0xaa; 16]) });
            roundtrip(doc! { "b": Vec::<u8>::new() });
        }

        #[test]
        fn object_id_and_datetime() {
            let id = ObjectId::from_bytes([7; 12]);
            let when = DateTime::from_millis(-86_400_123);
            roundtrip(doc! { "_id": id, "when": when });
        }
    }

    mod nested {
        use super::*;

        #[test]
        fn documents_and_arrays() {
            let doc = doc! {
                "_id": doc! { "f": "a@example.com", "t": "b@example.com" },
                "list": vec![
                    Value::from(doc! { "x": 1 }),
                    Value::from(vec![Value::from(1), Value::Null]),
                ],
                "count": 1,
            };
            roundtrip(doc);
        }

        #[test]
        fn depth_limit() {
            let mut doc = doc! { "leaf": 1 };
            for _ in 0..MAX_DEPTH + 1 {
                doc = doc! { "d": doc };
            }
            let mut enc = Vec::new();
            assert!(matches!(
                serialize_doc(&mut enc, &doc, 0),
                Err(Error::ParseLimit(_))
            ));
        }

        #[test]
        fn array_keys_out_of_sequence() {
            // {"a": ["x"]} but with the array key spelled "1"
            let enc: &[u8] = b"\x16\x00\x00\x00\x04a\x00\x0e\x00\x00\x00\x021\x00\x02\x00\x00\x00x\x00\x00\x00";
            let err = Parser::new(enc).parse_doc(0).unwrap_err();
            assert!(matches!(err, Error::MalformedFrame(_)), "{}", err);
        }
    }

    mod malformed {
        use super::*;

        #[test]
        fn unsupported_tag() {
            // {"u": undefined}
            let enc: &[u8] = b"\x08\x00\x00\x00\x06u\x00\x00";
            let err = Parser::new(enc).parse_doc(0).unwrap_err();
            assert!(matches!(err, Error::UnsupportedValue(_)), "{}", err);
        }

        #[test]
        fn bad_terminator() {
            let enc: &[u8] = &[5, 0, 0, 0, 1];
            assert!(matches!(
                Parser::new(enc).parse_doc(0),
                Err(Error::MalformedFrame(_))
            ));
        }

        #[test]
        fn length_below_minimum() {
            for len in [0u8, 4] {
                let enc = [len, 0, 0, 0, 0];
                assert!(matches!(
                    Parser::new(&enc).parse_doc(0),
                    Err(Error::MalformedFrame(_))
                ));
            }
        }

        #[test]
        fn string_runs_past_document() {
            // String declares 100 bytes inside a 16-byte document
            let enc: &[u8] = b"\x10\x00\x00\x00\x02s\x00\x64\x00\x00\x00abc\x00\x00";
            assert!(matches!(
                Parser::new(enc).parse_doc(0),
                Err(Error::MalformedFrame(_))
            ));
        }

        #[test]
        fn bad_bool() {
            let enc: &[u8] = b"\x09\x00\x00\x00\x08b\x00\x02\x00";
            assert!(matches!(
                Parser::new(enc).parse_doc(0),
                Err(Error::MalformedFrame(_))
            ));
        }

        #[test]
        fn nul_in_field_name() {
            let mut enc = Vec::new();
            let err = serialize_doc(&mut enc, &doc! { "a\u{0}b": 1 }, 0).unwrap_err();
            assert!(matches!(err, Error::UnsupportedValue(_)));
        }

        #[test]
        fn not_enough_bytes() {
            let enc = encode(&doc! { "i": 1i64, "s": "hello" });
            for cut in 0..enc.len() {
                assert!(
                    Parser::new(&enc[..cut]).parse_doc(0).is_err(),
                    "Cut at {} should fail",
                    cut
                );
            }
        }
    }
}
