use std::fmt;
use std::str::FromStr;

use serde::{
    de::{Deserialize, Deserializer, Error, Unexpected},
    ser::{Serialize, Serializer},
};
use serde_bytes::ByteBuf;

/// The opaque 12-byte identifier conventionally stored in a document's `_id` field.
///
/// The bytes are never interpreted; they're carried through the codec untouched and compared
/// byte-for-byte.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId {
    bytes: [u8; 12],
}

impl ObjectId {
    pub const fn from_bytes(bytes: [u8; 12]) -> ObjectId {
        ObjectId { bytes }
    }

    pub fn bytes(&self) -> [u8; 12] {
        self.bytes
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }
}

impl AsRef<[u8]> for ObjectId {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl TryFrom<&[u8]> for ObjectId {
    type Error = String;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; 12] = value
            .try_into()
            .map_err(|_| format!("ObjectId must be 12 bytes, got {}", value.len()))?;
        Ok(ObjectId { bytes })
    }
}

impl FromStr for ObjectId {
    type Err = String;

    /// Parse the usual 24-character hex form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 12];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|e| format!("ObjectId must be 24 hex characters, got {:?}: {}", s, e))?;
        Ok(ObjectId { bytes })
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex())
        } else {
            serializer.serialize_bytes(&self.bytes)
        }
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            s.parse()
                .map_err(|_| D::Error::invalid_value(Unexpected::Str(&s), &"24 hex characters"))
        } else {
            let bytes = ByteBuf::deserialize(deserializer)?;
            ObjectId::try_from(bytes.as_ref())
                .map_err(|_| D::Error::invalid_length(bytes.len(), &"12 bytes"))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn hex_roundtrip() {
        let id = ObjectId::from_bytes([
            0x50, 0x7f, 0x1f, 0x77, 0xbc, 0xf8, 0x6c, 0xd7, 0x99, 0x43, 0x90, 0x11,
        ]);
        let hex = id.to_string();
        assert_eq!(hex, "507f1f77bcf86cd799439011");
        assert_eq!(hex.parse::<ObjectId>().unwrap(), id);
    }

    #[test]
    fn bad_hex() {
        assert!("507f1f77bcf86cd79943901".parse::<ObjectId>().is_err());
        assert!("507f1f77bcf86cd79943901z".parse::<ObjectId>().is_err());
        assert!("507f1f77bcf86cd7994390110".parse::<ObjectId>().is_err());
    }

    #[test]
    fn signs_are_not_hex() {
        assert!("+f+f+f+f+f+f+f+f+f+f+f+f".parse::<ObjectId>().is_err());
        assert!("-f0f0f0f0f0f0f0f0f0f0f0f".parse::<ObjectId>().is_err());
    }

    #[test]
    fn uppercase_hex() {
        let id: ObjectId = "507F1F77BCF86CD799439011".parse().unwrap();
        assert_eq!(id.to_hex(), "507f1f77bcf86cd799439011");
    }

    #[test]
    fn wrong_length_bytes() {
        assert!(ObjectId::try_from(&[0u8; 11][..]).is_err());
        assert!(ObjectId::try_from(&[0u8; 12][..]).is_ok());
    }

    #[test]
    fn json_is_hex() {
        let id = ObjectId::from_bytes([1; 12]);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"010101010101010101010101\"");
        let back: ObjectId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
