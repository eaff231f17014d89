//! Ordered documents, the unit of data exchanged over the pipes.
//!
//! A [`Document`] is an ordered list of named [`Value`]s. Field order is kept exactly as it was
//! decoded or inserted, since the wire encoding is order-preserving and downstream consumers may
//! care. Field names are unique: inserting an existing name replaces its value in place.
//!
//! The [`doc!`](crate::doc) macro builds documents inline:
//!
//! ```
//! # use bson_streaming::{doc, Value};
//! let key = doc! { "f": "alice@example.com", "t": "bob@example.com" };
//! let doc = doc! {
//!     "_id": key,
//!     "count": 1,
//! };
//! assert_eq!(doc["count"], Value::Int32(1));
//! ```

use crate::{frame, value::Binary, DateTime, ObjectId, Result, Value, ID_FIELD};
use std::collections::HashMap;
use std::fmt;
use std::ops::Index;

static NULL: Value = Value::Null;

/// Construct a [`Document`] from `"name": value` pairs. Each value may be any expression that
/// implements `Into<Value>`, including another `doc!`.
///
/// Trailing commas are allowed.
#[macro_export]
macro_rules! doc {
    () => {
        $crate::Document::new()
    };
    ($($key:literal : $val:expr),+ $(,)?) => {{
        let mut doc = $crate::Document::new();
        $(
            doc.insert($key, $val);
        )+
        doc
    }};
}

/// An ordered document.
///
/// Fields live in insertion order, with a name-to-position index beside them so lookups and
/// replacing inserts don't scan the whole document.
#[derive(Clone, Default)]
pub struct Document {
    fields: Vec<(String, Value)>,
    index: HashMap<String, usize>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    /// Decode a single complete frame. See [`frame::decode`].
    pub fn from_frame(buf: &[u8]) -> Result<Document> {
        frame::decode(buf)
    }

    /// Encode into a single frame. See [`frame::encode`].
    pub fn to_frame(&self) -> Result<Vec<u8>> {
        frame::encode(self)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        let pos = *self.index.get(key)?;
        Some(&self.fields[pos].1)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        let pos = *self.index.get(key)?;
        Some(&mut self.fields[pos].1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Set a field. If the field already exists, its value is replaced in place and the old value
    /// returned; otherwise the field is appended.
    pub fn insert<K: Into<String>, V: Into<Value>>(&mut self, key: K, value: V) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        match self.index.get(&key) {
            Some(&pos) => Some(std::mem::replace(&mut self.fields[pos].1, value)),
            None => {
                self.index.insert(key.clone(), self.fields.len());
                self.fields.push((key, value));
                None
            }
        }
    }

    /// Remove a field, keeping the order of the rest.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let pos = self.index.remove(key)?;
        let (_, value) = self.fields.remove(pos);
        for (k, _) in &self.fields[pos..] {
            if let Some(p) = self.index.get_mut(k.as_str()) {
                *p -= 1;
            }
        }
        Some(value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> + '_ {
        self.fields.iter().map(|(_, v)| v)
    }

    /// The `_id` field, which is the grouping key by convention.
    pub fn id(&self) -> Option<&Value> {
        self.get(ID_FIELD)
    }

    /// Structural equality, with the field order ignored and values compared by
    /// [`Value::key_eq`].
    pub fn key_eq(&self, other: &Document) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(k, v)| other.get(k).map_or(false, |o| v.key_eq(o)))
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    pub fn get_i32(&self, key: &str) -> Option<i32> {
        self.get(key).and_then(Value::as_i32)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_binary(&self, key: &str) -> Option<&Binary> {
        self.get(key).and_then(Value::as_binary)
    }

    pub fn get_document(&self, key: &str) -> Option<&Document> {
        self.get(key).and_then(Value::as_document)
    }

    pub fn get_array(&self, key: &str) -> Option<&[Value]> {
        self.get(key).and_then(Value::as_array)
    }

    pub fn get_object_id(&self, key: &str) -> Option<ObjectId> {
        self.get(key).and_then(Value::as_object_id)
    }

    pub fn get_datetime(&self, key: &str) -> Option<DateTime> {
        self.get(key).and_then(Value::as_datetime)
    }
}

impl Index<&str> for Document {
    type Output = Value;

    fn index(&self, index: &str) -> &Self::Output {
        self.get(index).unwrap_or(&NULL)
    }
}

impl PartialEq for Document {
    /// Field order matters.
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Into<String>, V: Into<Value>> std::iter::FromIterator<(K, V)> for Document {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut doc = Document::new();
        doc.extend(iter);
        doc
    }
}

impl<K: Into<String>, V: Into<Value>> Extend<(K, V)> for Document {
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl serde::Serialize for Document {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (k, v) in self.iter() {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> serde::Deserialize<'de> for Document {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::{Error, Unexpected};
        match <Value as serde::Deserialize>::deserialize(deserializer)? {
            Value::Document(doc) => Ok(doc),
            other => Err(D::Error::invalid_type(
                Unexpected::Other(other.type_name()),
                &"a map",
            )),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn insert_keeps_order() {
        let mut doc = doc! { "b": 1, "a": 2 };
        doc.insert("c", 3);
        assert_eq!(doc.keys().collect::<Vec<_>>(), vec!["b", "a", "c"]);
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut doc = doc! { "value": 3.2, "_id": 4 };
        let old = doc.insert("value", "x");
        assert_eq!(old, Some(Value::Double(3.2)));
        assert_eq!(doc.keys().collect::<Vec<_>>(), vec!["value", "_id"]);
        assert_eq!(doc.get_str("value"), Some("x"));
    }

    #[test]
    fn remove() {
        let mut doc = doc! { "a": 1, "b": 2, "c": 3 };
        assert_eq!(doc.remove("b"), Some(Value::Int32(2)));
        assert_eq!(doc.remove("b"), None);
        assert_eq!(doc.keys().collect::<Vec<_>>(), vec!["a", "c"]);
    }

    #[test]
    fn lookups_after_remove() {
        let mut doc: Document = (0..10).map(|i| (format!("f{}", i), i)).collect();
        doc.remove("f3");
        doc.remove("f0");
        assert_eq!(doc.len(), 8);
        for i in [1, 2, 4, 9] {
            assert_eq!(doc.get_i32(&format!("f{}", i)), Some(i));
        }
        assert!(!doc.contains_key("f3"));
        doc.insert("f3", 30);
        doc.insert("f9", 90);
        assert_eq!(doc.keys().last(), Some("f3"));
        assert_eq!(doc.get_i32("f9"), Some(90));
        assert_eq!(doc.keys().nth(6), Some("f9"));
    }

    #[test]
    fn equality_ignores_lookup_state() {
        let mut a = doc! { "x": 1, "y": 2 };
        a.remove("y");
        a.insert("y", 2);
        assert_eq!(a, doc! { "x": 1, "y": 2 });
        assert_ne!(a, doc! { "y": 2, "x": 1 });
        assert_eq!(format!("{:?}", a), r#"{"x": Int32(1), "y": Int32(2)}"#);
    }

    #[test]
    fn typed_getters() {
        let when = DateTime::from_ymd(1990, 1, 2).unwrap();
        let doc = doc! {
            "_id": when,
            "bc10Year": 7.94,
            "n": 3,
            "name": "treasury",
            "nested": doc! { "ok": true },
        };
        assert_eq!(doc.id(), Some(&Value::DateTime(when)));
        assert_eq!(doc.get_datetime("_id"), Some(when));
        assert_eq!(doc.get_f64("bc10Year"), Some(7.94));
        assert_eq!(doc.get_i64("n"), Some(3));
        assert_eq!(doc.get_str("name"), Some("treasury"));
        assert_eq!(doc.get_document("nested").and_then(|d| d.get_bool("ok")), Some(true));
        assert_eq!(doc.get_f64("n"), None);
        assert!(doc["missing"].is_null());
    }

    #[test]
    fn key_eq_ignores_order() {
        let a = doc! { "x": 1, "y": "two" };
        let b = doc! { "y": "two", "x": 1i64 };
        assert!(a.key_eq(&b));
        assert!(!a.key_eq(&doc! { "x": 1 }));
        assert!(!a.key_eq(&doc! { "x": 1, "z": "two" }));
    }

    #[test]
    fn collect_from_pairs() {
        let doc: Document = vec![("a", 1), ("b", 2), ("a", 3)].into_iter().collect();
        assert_eq!(doc, doc! { "a": 3, "b": 2 });
    }

    #[test]
    fn json_roundtrip() {
        let doc = doc! { "z": 1, "a": doc! { "q": "r" } };
        let json = serde_json::to_string(&doc).unwrap();
        assert_eq!(json, r#"{"z":1,"a":{"q":"r"}}"#);
        let back: Document = serde_json::from_str(&json).unwrap();
        assert_eq!(back, doc);
        assert!(serde_json::from_str::<Document>("[1]").is_err());
    }
}
