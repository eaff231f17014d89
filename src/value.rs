use crate::*;
use crate::marker::ElementType;
use base64::Engine;
use std::borrow::Cow;
use std::fmt::Debug;
use std::ops::Index;

static NULL: Value = Value::Null;

/// A binary blob, along with the BSON subtype byte it was stored under. Subtype 0 is "generic
/// binary", which is what plain byte vectors become.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Binary {
    pub subtype: u8,
    pub bytes: Vec<u8>,
}

impl Binary {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { subtype: 0, bytes }
    }

    pub fn with_subtype(subtype: u8, bytes: Vec<u8>) -> Self {
        Self { subtype, bytes }
    }
}

/// One field value inside a [`Document`].
///
/// `PartialEq` is exact: `Int32(1)` and `Int64(1)` are different values, and `NaN` is never
/// equal to itself. For grouping keys, use [`Value::key_eq`] instead.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Double(f64),
    Str(String),
    Binary(Binary),
    Document(Document),
    Array(Vec<Value>),
    ObjectId(ObjectId),
    DateTime(DateTime),
}

// Numeric view used by key equality, so ints of either width and doubles compare by value.
#[derive(Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn same(self, other: Number) -> bool {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a == b,
            (Number::Float(a), Number::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Number::Int(i), Number::Float(f)) | (Number::Float(f), Number::Int(i)) => {
                // -2^63 <= f < 2^63 keeps the cast from saturating
                f.fract() == 0.0
                    && f >= -9_223_372_036_854_775_808.0
                    && f < 9_223_372_036_854_775_808.0
                    && f as i64 == i
            }
        }
    }
}

impl Value {
    pub(crate) fn element_type(&self) -> ElementType {
        match *self {
            Value::Null => ElementType::Null,
            Value::Bool(_) => ElementType::Boolean,
            Value::Int32(_) => ElementType::Int32,
            Value::Int64(_) => ElementType::Int64,
            Value::Double(_) => ElementType::Double,
            Value::Str(_) => ElementType::String,
            Value::Binary(_) => ElementType::Binary,
            Value::Document(_) => ElementType::Document,
            Value::Array(_) => ElementType::Array,
            Value::ObjectId(_) => ElementType::ObjectId,
            Value::DateTime(_) => ElementType::DateTime,
        }
    }

    /// Name of the value's type, for messages.
    pub fn type_name(&self) -> &'static str {
        self.element_type().name()
    }

    /// Structural equality for grouping keys.
    ///
    /// Differs from `==` in three ways: integers of either width and doubles compare by numeric
    /// value, `NaN` equals `NaN`, and embedded documents compare field by field regardless of
    /// field order. Arrays stay order-sensitive.
    pub fn key_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Binary(a), Value::Binary(b)) => a == b,
            (Value::ObjectId(a), Value::ObjectId(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.key_eq(y))
            }
            (Value::Document(a), Value::Document(b)) => a.key_eq(b),
            (a, b) => match (a.as_number(), b.as_number()) {
                (Some(x), Some(y)) => x.same(y),
                _ => false,
            },
        }
    }

    fn as_number(&self) -> Option<Number> {
        match *self {
            Value::Int32(v) => Some(Number::Int(v as i64)),
            Value::Int64(v) => Some(Number::Int(v)),
            Value::Double(v) => Some(Number::Float(v)),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    /// True for both integer widths.
    pub fn is_int(&self) -> bool {
        matches!(self, Value::Int32(_) | Value::Int64(_))
    }

    pub fn is_f64(&self) -> bool {
        matches!(self, Value::Double(_))
    }

    pub fn is_str(&self) -> bool {
        matches!(self, Value::Str(_))
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, Value::Binary(_))
    }

    pub fn is_document(&self) -> bool {
        matches!(self, Value::Document(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    pub fn is_object_id(&self) -> bool {
        matches!(self, Value::ObjectId(_))
    }

    pub fn is_datetime(&self) -> bool {
        matches!(self, Value::DateTime(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        if let Value::Bool(val) = *self {
            Some(val)
        } else {
            None
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match *self {
            Value::Int32(v) => Some(v),
            Value::Int64(v) => i32::try_from(v).ok(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int32(v) => Some(v as i64),
            Value::Int64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Double(n) => Some(n),
            _ => None,
        }
    }

    /// Any numeric value as a double. Large 64-bit integers lose precision.
    pub fn as_floating(&self) -> Option<f64> {
        match *self {
            Value::Int32(v) => Some(v as f64),
            Value::Int64(v) => Some(v as f64),
            Value::Double(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        if let Value::Str(ref s) = *self {
            Some(s.as_str())
        } else {
            None
        }
    }

    pub fn as_binary(&self) -> Option<&Binary> {
        if let Value::Binary(ref v) = *self {
            Some(v)
        } else {
            None
        }
    }

    pub fn as_slice(&self) -> Option<&[u8]> {
        self.as_binary().map(|b| b.bytes.as_slice())
    }

    pub fn as_document(&self) -> Option<&Document> {
        if let Value::Document(ref v) = *self {
            Some(v)
        } else {
            None
        }
    }

    pub fn as_document_mut(&mut self) -> Option<&mut Document> {
        if let Value::Document(ref mut v) = *self {
            Some(v)
        } else {
            None
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        if let Value::Array(ref array) = *self {
            Some(&*array)
        } else {
            None
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
        match *self {
            Value::Array(ref mut array) => Some(array),
            _ => None,
        }
    }

    pub fn as_object_id(&self) -> Option<ObjectId> {
        if let Value::ObjectId(id) = *self {
            Some(id)
        } else {
            None
        }
    }

    pub fn as_datetime(&self) -> Option<DateTime> {
        if let Value::DateTime(t) = *self {
            Some(t)
        } else {
            None
        }
    }
}

impl std::default::Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl Index<usize> for Value {
    type Output = Value;

    /// Index into an array. Anything out of range, or a non-array value, gives `Null`.
    fn index(&self, index: usize) -> &Self::Output {
        self.as_array().and_then(|v| v.get(index)).unwrap_or(&NULL)
    }
}

impl Index<&str> for Value {
    type Output = Value;

    /// Index into an embedded document. Missing fields, or a non-document value, give `Null`.
    fn index(&self, index: &str) -> &Self::Output {
        self.as_document().and_then(|v| v.get(index)).unwrap_or(&NULL)
    }
}

macro_rules! impl_value_from {
    ($t: ty, $p: ident) => {
        impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::$p(v)
            }
        }
    };
}

macro_rules! impl_value_from_small_int {
    ($t: ty) => {
        impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Int32(From::from(v))
            }
        }
    };
}

impl_value_from!(bool, Bool);
impl_value_from!(i32, Int32);
impl_value_from!(i64, Int64);
impl_value_from!(f64, Double);
impl_value_from!(String, Str);
impl_value_from!(Binary, Binary);
impl_value_from!(Document, Document);
impl_value_from!(Vec<Value>, Array);
impl_value_from!(ObjectId, ObjectId);
impl_value_from!(DateTime, DateTime);
impl_value_from_small_int!(i8);
impl_value_from_small_int!(i16);
impl_value_from_small_int!(u8);
impl_value_from_small_int!(u16);

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int64(v as i64)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Double(v as f64)
    }
}

impl From<()> for Value {
    fn from((): ()) -> Self {
        Value::Null
    }
}

impl<'a> From<&'a str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl<'a> From<Cow<'a, str>> for Value {
    fn from(v: Cow<'a, str>) -> Self {
        Value::Str(v.into_owned())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Binary(Binary::new(v))
    }
}

impl<'a> From<&'a [u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Binary(Binary::new(v.to_vec()))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl<'a> From<&'a Value> for Value {
    fn from(v: &Value) -> Self {
        v.clone()
    }
}

impl<V: Into<Value>> std::iter::FromIterator<V> for Value {
    fn from_iter<T: IntoIterator<Item = V>>(iter: T) -> Self {
        let v: Vec<Value> = iter.into_iter().map(Into::into).collect();
        Value::Array(v)
    }
}

macro_rules! impl_try_from_value {
    ($t: ty, $p: ident) => {
        impl TryFrom<Value> for $t {
            type Error = Value;
            fn try_from(v: Value) -> Result<Self, Self::Error> {
                match v {
                    Value::$p(v) => Ok(v),
                    _ => Err(v),
                }
            }
        }
    };
}

impl_try_from_value!(bool, Bool);
impl_try_from_value!(f64, Double);
impl_try_from_value!(String, Str);
impl_try_from_value!(Binary, Binary);
impl_try_from_value!(Document, Document);
impl_try_from_value!(Vec<Value>, Array);
impl_try_from_value!(ObjectId, ObjectId);
impl_try_from_value!(DateTime, DateTime);

impl TryFrom<Value> for i32 {
    type Error = Value;
    fn try_from(v: Value) -> Result<Self, Self::Error> {
        v.as_i32().ok_or(v)
    }
}

impl TryFrom<Value> for i64 {
    type Error = Value;
    fn try_from(v: Value) -> Result<Self, Self::Error> {
        v.as_i64().ok_or(v)
    }
}

impl serde::Serialize for Value {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::Int32(v) => serializer.serialize_i32(*v),
            Value::Int64(v) => serializer.serialize_i64(*v),
            Value::Double(v) => serializer.serialize_f64(*v),
            Value::Str(v) => serializer.serialize_str(v),
            Value::Binary(v) => {
                if serializer.is_human_readable() {
                    serializer.serialize_str(
                        &base64::engine::general_purpose::STANDARD.encode(&v.bytes),
                    )
                } else {
                    serializer.serialize_bytes(&v.bytes)
                }
            }
            Value::Document(v) => v.serialize(serializer),
            Value::Array(v) => v.serialize(serializer),
            Value::ObjectId(v) => v.serialize(serializer),
            Value::DateTime(v) => {
                if serializer.is_human_readable() {
                    serializer.collect_str(v)
                } else {
                    v.serialize(serializer)
                }
            }
        }
    }
}

impl<'de> serde::Deserialize<'de> for Value {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::*;
        use std::fmt;

        struct ValueVisitor;
        impl<'de> Visitor<'de> for ValueVisitor {
            type Value = Value;

            fn expecting(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
                fmt.write_str("any valid document Value")
            }

            fn visit_bool<E: Error>(self, v: bool) -> Result<Self::Value, E> {
                Ok(Value::Bool(v))
            }

            fn visit_i32<E: Error>(self, v: i32) -> Result<Self::Value, E> {
                Ok(Value::Int32(v))
            }

            // Integers take the narrowest width that holds them.
            fn visit_i64<E: Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(i32::try_from(v).map_or(Value::Int64(v), Value::Int32))
            }

            fn visit_u64<E: Error>(self, v: u64) -> Result<Self::Value, E> {
                let v = i64::try_from(v)
                    .map_err(|_| E::invalid_value(Unexpected::Unsigned(v), &"a 64-bit signed integer"))?;
                self.visit_i64(v)
            }

            fn visit_f64<E: Error>(self, v: f64) -> Result<Self::Value, E> {
                Ok(Value::Double(v))
            }

            fn visit_str<E: Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(Value::Str(v.into()))
            }

            fn visit_string<E: Error>(self, v: String) -> Result<Self::Value, E> {
                Ok(Value::Str(v))
            }

            fn visit_bytes<E: Error>(self, v: &[u8]) -> Result<Self::Value, E> {
                Ok(Value::Binary(Binary::new(v.into())))
            }

            fn visit_byte_buf<E: Error>(self, v: Vec<u8>) -> Result<Self::Value, E> {
                Ok(Value::Binary(Binary::new(v)))
            }

            fn visit_unit<E: Error>(self) -> Result<Self::Value, E> {
                Ok(Value::Null)
            }

            fn visit_none<E: Error>(self) -> Result<Self::Value, E> {
                Ok(Value::Null)
            }

            fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
                Value::deserialize(d)
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                // Allocate with the size hint, but be conservative. 4096 is what serde uses
                // internally for collections, so we'll do likewise.
                let mut seq = match access.size_hint() {
                    Some(size) => Vec::with_capacity(size.min(4096)),
                    None => Vec::new(),
                };
                while let Some(elem) = access.next_element()? {
                    seq.push(elem);
                }
                Ok(Value::Array(seq))
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut doc = Document::new();
                while let Some((key, val)) = access.next_entry::<String, Value>()? {
                    doc.insert(key, val);
                }
                Ok(Value::Document(doc))
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    mod key_eq {
        use super::*;

        #[test]
        fn mixed_int_widths() {
            assert!(Value::Int32(5).key_eq(&Value::Int64(5)));
            assert!(Value::Int64(5).key_eq(&Value::Double(5.0)));
            assert!(!Value::Int32(5).key_eq(&Value::Double(5.5)));
            assert!(!Value::Int64(i64::MAX).key_eq(&Value::Double(9_223_372_036_854_775_808.0)));
            assert_ne!(Value::Int32(5), Value::Int64(5));
        }

        #[test]
        fn nan() {
            let nan = Value::Double(f64::NAN);
            assert!(nan.key_eq(&nan.clone()));
            assert_ne!(nan, nan.clone());
        }

        #[test]
        fn documents_ignore_field_order() {
            let a = Value::Document(doc! { "f": "alice", "t": "bob" });
            let b = Value::Document(doc! { "t": "bob", "f": "alice" });
            let c = Value::Document(doc! { "t": "bob", "f": "carol" });
            assert!(a.key_eq(&b));
            assert!(!a.key_eq(&c));
            assert_ne!(a, b);
        }

        #[test]
        fn arrays_keep_order() {
            let a: Value = vec![1, 2].into_iter().collect();
            let b: Value = vec![2, 1].into_iter().collect();
            assert!(a.key_eq(&a.clone()));
            assert!(!a.key_eq(&b));
        }

        #[test]
        fn types_differ() {
            assert!(!Value::Str("1".into()).key_eq(&Value::Int32(1)));
            assert!(!Value::Null.key_eq(&Value::Bool(false)));
        }
    }

    #[test]
    fn index_missing_is_null() {
        let v = Value::Document(doc! { "a": doc! { "b": 1 } });
        assert_eq!(v["a"]["b"], Value::Int32(1));
        assert!(v["a"]["c"].is_null());
        assert!(v["x"][3].is_null());
    }

    #[test]
    fn from_option() {
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::Str("x".into()));
    }

    #[test]
    fn try_from() {
        assert_eq!(i64::try_from(Value::Int32(7)), Ok(7));
        assert_eq!(i32::try_from(Value::Int64(1 << 40)), Err(Value::Int64(1 << 40)));
        assert_eq!(String::try_from(Value::from("s")), Ok("s".to_string()));
    }

    #[test]
    fn json_roundtrip() {
        let v = Value::Document(doc! {
            "_id": 1999,
            "big": 1i64 << 40,
            "avg": 5.25,
            "tags": vec![Value::from("a"), Value::Null],
            "ok": true,
        });
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, r#"{"_id":1999,"big":1099511627776,"avg":5.25,"tags":["a",null],"ok":true}"#);
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }

    #[test]
    fn json_special_types() {
        let v = Value::Document(doc! {
            "bin": vec![0u8, 1, 2],
            "when": DateTime::from_millis(0),
        });
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, r#"{"bin":"AAEC","when":"1970-01-01T00:00:00.000Z"}"#);
    }
}
