/// BSON element type tags. For internal use only.
///
/// Only the tags in the supported value set have variants. Everything else, including the
/// deprecated types (undefined, DBPointer, symbol), comes back as `Unsupported` so the decoder
/// can report the raw tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementType {
    Double,
    String,
    Document,
    Array,
    Binary,
    ObjectId,
    Boolean,
    DateTime,
    Null,
    Int32,
    Int64,
    Unsupported(u8),
}

impl ElementType {
    /// Construct an element type from its single-byte tag.
    pub fn from_u8(n: u8) -> ElementType {
        match n {
            0x01 => ElementType::Double,
            0x02 => ElementType::String,
            0x03 => ElementType::Document,
            0x04 => ElementType::Array,
            0x05 => ElementType::Binary,
            0x07 => ElementType::ObjectId,
            0x08 => ElementType::Boolean,
            0x09 => ElementType::DateTime,
            0x0a => ElementType::Null,
            0x10 => ElementType::Int32,
            0x12 => ElementType::Int64,
            n => ElementType::Unsupported(n),
        }
    }

    pub fn into_u8(self) -> u8 {
        match self {
            ElementType::Double => 0x01,
            ElementType::String => 0x02,
            ElementType::Document => 0x03,
            ElementType::Array => 0x04,
            ElementType::Binary => 0x05,
            ElementType::ObjectId => 0x07,
            ElementType::Boolean => 0x08,
            ElementType::DateTime => 0x09,
            ElementType::Null => 0x0a,
            ElementType::Int32 => 0x10,
            ElementType::Int64 => 0x12,
            ElementType::Unsupported(n) => n,
        }
    }

    /// Name used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            ElementType::Double => "Double",
            ElementType::String => "String",
            ElementType::Document => "Document",
            ElementType::Array => "Array",
            ElementType::Binary => "Binary",
            ElementType::ObjectId => "ObjectId",
            ElementType::Boolean => "Boolean",
            ElementType::DateTime => "DateTime",
            ElementType::Null => "Null",
            ElementType::Int32 => "Int32",
            ElementType::Int64 => "Int64",
            ElementType::Unsupported(_) => "Unsupported",
        }
    }
}

impl From<u8> for ElementType {
    fn from(n: u8) -> ElementType {
        ElementType::from_u8(n)
    }
}

impl From<ElementType> for u8 {
    fn from(t: ElementType) -> u8 {
        t.into_u8()
    }
}
