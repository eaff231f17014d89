//! The key/value form of the pipes.
//!
//! Instead of whole documents, user functions here see `(key, payload)` pairs. On the way in, the
//! key is read from each document's `_id` field and the document itself becomes the payload. On
//! the way out, a [`Payload::Mapping`] gets its `_id` set to the key, and a [`Payload::Scalar`] is
//! wrapped as `{ value: <scalar>, _id: <key> }`.
//!
//! ```
//! # use bson_streaming::{doc, kv::KeyValue, Value};
//! let pair = KeyValue::new(5, 3.2);
//! let doc = pair.clone().into_document();
//! assert_eq!(doc, doc! { "value": 3.2, "_id": 5 });
//!
//! let back = KeyValue::from_document(doc).unwrap();
//! assert_eq!(back.key, Value::Int32(5));
//! assert_eq!(back.value.scalar(), Some(&Value::Double(3.2)));
//! ```

use crate::mapper::map_with;
use crate::reducer::{reduce_with, Keyed};
use crate::{Document, Error, FrameWriter, MapStats, ReduceStats, Result, Value, ID_FIELD, VALUE_FIELD};
use std::{io::Write, iter::FusedIterator};

/// The value half of a key/value pair.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    /// A bare value, written as `{ value: <scalar>, _id: <key> }`.
    Scalar(Value),
    /// A document, written as-is with its `_id` set to the key.
    Mapping(Document),
}

impl Payload {
    /// The scalar this payload carries: either a [`Payload::Scalar`] itself, or a mapping of the
    /// form `{ value: <scalar> }` with at most an `_id` alongside.
    pub fn scalar(&self) -> Option<&Value> {
        match self {
            Payload::Scalar(v) => Some(v),
            Payload::Mapping(doc) => {
                if doc.keys().all(|k| k == VALUE_FIELD || k == ID_FIELD) {
                    doc.get(VALUE_FIELD)
                } else {
                    None
                }
            }
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Payload::Mapping(doc) => Some(doc),
            Payload::Scalar(_) => None,
        }
    }

    /// Look up a field of a mapping payload. Scalars have no fields.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.as_document().and_then(|doc| doc.get(field))
    }

    pub fn into_value(self) -> Value {
        match self {
            Payload::Scalar(v) => v,
            Payload::Mapping(doc) => Value::Document(doc),
        }
    }
}

impl From<Document> for Payload {
    fn from(doc: Document) -> Self {
        Payload::Mapping(doc)
    }
}

impl From<Value> for Payload {
    /// Documents become mappings, everything else a scalar.
    fn from(v: Value) -> Self {
        match v {
            Value::Document(doc) => Payload::Mapping(doc),
            v => Payload::Scalar(v),
        }
    }
}

macro_rules! impl_payload_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Payload {
                fn from(v: $t) -> Self {
                    Payload::from(Value::from(v))
                }
            }
        )*
    };
}

impl_payload_from!(bool, i32, i64, f64, String, &str);

/// A key and its payload.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyValue {
    pub key: Value,
    pub value: Payload,
}

impl KeyValue {
    pub fn new<K: Into<Value>, V: Into<Payload>>(key: K, value: V) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Split a document into its `_id` key and the whole document as a mapping payload.
    pub fn from_document(doc: Document) -> Result<Self> {
        let key = doc.id().cloned().ok_or(Error::MissingKey)?;
        Ok(Self {
            key,
            value: Payload::Mapping(doc),
        })
    }

    /// Build the document written for this pair. A mapping's existing `_id`, if any, is
    /// overwritten by the key.
    pub fn into_document(self) -> Document {
        match self.value {
            Payload::Mapping(mut doc) => {
                doc.insert(ID_FIELD, self.key);
                doc
            }
            Payload::Scalar(v) => {
                let mut doc = Document::with_capacity(2);
                doc.insert(VALUE_FIELD, v);
                doc.insert(ID_FIELD, self.key);
                doc
            }
        }
    }
}

impl<K: Into<Value>, V: Into<Payload>> From<(K, V)> for KeyValue {
    fn from((key, value): (K, V)) -> Self {
        KeyValue::new(key, value)
    }
}

impl From<KeyValue> for Document {
    fn from(kv: KeyValue) -> Self {
        kv.into_document()
    }
}

impl Keyed for KeyValue {
    fn key(&self) -> Result<Value> {
        Ok(self.key.clone())
    }
}

/// An iterator adapter from documents to key/value pairs.
///
/// A document without an `_id` yields [`Error::MissingKey`] and ends the iteration, as does any
/// error from the underlying iterator.
#[derive(Clone, Debug)]
pub struct KeyValueReader<I> {
    iter: I,
    done: bool,
}

impl<I> KeyValueReader<I>
where
    I: Iterator<Item = Result<Document>>,
{
    pub fn new(iter: I) -> Self {
        Self { iter, done: false }
    }
}

impl<I> Iterator for KeyValueReader<I>
where
    I: Iterator<Item = Result<Document>>,
{
    type Item = Result<KeyValue>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let result = match self.iter.next()? {
            Ok(doc) => KeyValue::from_document(doc),
            Err(e) => Err(e),
        };
        if result.is_err() {
            self.done = true;
        }
        Some(result)
    }
}

impl<I> FusedIterator for KeyValueReader<I> where I: Iterator<Item = Result<Document>> + FusedIterator {}

/// [`map`][crate::map] over key/value pairs.
///
/// `transform` gets each input's key and payload, and returns any iterable of [`KeyValue`]s (or
/// `Option`s of them).
pub fn map_kv<F, I, R, W>(mut transform: F, reader: R, writer: FrameWriter<W>) -> Result<MapStats>
where
    F: FnMut(Value, Payload) -> anyhow::Result<I>,
    I: IntoIterator,
    I::Item: Into<Option<KeyValue>>,
    R: IntoIterator<Item = Result<Document>>,
    W: Write,
{
    map_with(
        |kv: KeyValue| transform(kv.key, kv.value),
        KeyValueReader::new(reader.into_iter()),
        writer,
        KeyValue::into_document,
    )
}

/// [`reduce`][crate::reduce] over key/value pairs.
///
/// `aggregate` gets each group's key and the payloads of its pairs, in order, and returns one
/// result pair. Anything convertible to [`KeyValue`] works, so a plain `(key, value)` tuple does.
pub fn reduce_kv<F, O, R, W>(mut aggregate: F, reader: R, writer: FrameWriter<W>) -> Result<ReduceStats>
where
    F: FnMut(Value, Vec<Payload>) -> anyhow::Result<O>,
    O: Into<KeyValue>,
    R: IntoIterator<Item = Result<Document>>,
    W: Write,
{
    reduce_with(
        |key, pairs: Vec<KeyValue>| aggregate(key, pairs.into_iter().map(|kv| kv.value).collect()),
        KeyValueReader::new(reader.into_iter()),
        writer,
        |out: O| Into::<KeyValue>::into(out).into_document(),
    )
}
