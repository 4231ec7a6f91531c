//! Core types for the invopack wire format

use std::fmt;

/// Byte order of every multi-byte scalar on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Big,
    Little,
}

/// Fixed once per build. Peers compiled with different settings cannot talk.
pub const WIRE_ORDER: ByteOrder = if cfg!(feature = "little-endian-wire") {
    ByteOrder::Little
} else {
    ByteOrder::Big
};

/// Numeric tag of a concrete schema type inside one polymorphic family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub i32);

impl ClassId {
    /// Reserved: an absent (null) polymorphic value.
    pub const ABSENT: ClassId = ClassId(0);

    pub const fn is_absent(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Primitive wire kinds understood by the primitive codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Prim {
    I32,
    U32,
    I16,
    U16,
    /// One UTF-16 code unit.
    Char,
    Byte,
    Bool,
    F32,
    F64,
    Str,
}

impl Prim {
    pub const fn name(self) -> &'static str {
        match self {
            Prim::I32 => "i32",
            Prim::U32 => "u32",
            Prim::I16 => "i16",
            Prim::U16 => "u16",
            Prim::Char => "char",
            Prim::Byte => "byte",
            Prim::Bool => "bool",
            Prim::F32 => "f32",
            Prim::F64 => "f64",
            Prim::Str => "string",
        }
    }

    /// Encoded width, or `None` for length-prefixed kinds.
    pub const fn width(self) -> Option<usize> {
        match self {
            Prim::I32 | Prim::U32 | Prim::F32 => Some(4),
            Prim::I16 | Prim::U16 | Prim::Char => Some(2),
            Prim::Byte | Prim::Bool => Some(1),
            Prim::F64 => Some(8),
            Prim::Str => None,
        }
    }

    /// Whether the kind can back an enumeration.
    pub const fn is_integer(self) -> bool {
        matches!(self, Prim::I32 | Prim::U32 | Prim::I16 | Prim::U16 | Prim::Byte)
    }

    /// Inclusive discriminant range for integer kinds.
    pub(crate) const fn integer_range(self) -> Option<(i64, i64)> {
        match self {
            Prim::I32 => Some((i32::MIN as i64, i32::MAX as i64)),
            Prim::U32 => Some((0, u32::MAX as i64)),
            Prim::I16 => Some((i16::MIN as i64, i16::MAX as i64)),
            Prim::U16 => Some((0, u16::MAX as i64)),
            Prim::Byte => Some((0, u8::MAX as i64)),
            _ => None,
        }
    }
}

impl fmt::Display for Prim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Mistakes in schema or enum declarations, caught by `Registry::build`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclarationError {
    DuplicateSchema(String),
    DuplicateEnum(String),
    UnknownParent { schema: String, parent: String },
    AncestorCycle(String),
    /// A field carries more than one order index.
    MultipleOrders { schema: String, field: String, count: usize },
    DuplicateOrder { schema: String, field: String, order: i32 },
    /// A field name repeats within a schema or shadows an ancestor field.
    DuplicateField { schema: String, field: String },
    UnknownSchema { schema: String, field: String, target: String },
    UnknownEnum { schema: String, field: String, target: String },
    UnknownFamily(String),
    InvalidEnumBacking { name: String, backing: Prim },
    EnumValueOutOfRange { name: String, variant: String, value: i64 },
    DuplicateEnumValue { name: String, value: i64 },
    ReservedClassId { schema: String },
    /// Closed fields nest a schema inside itself, so no finite value exists.
    ClosedCycle(String),
    /// A sequence or map element takes no bytes on the wire, so its count is unbounded.
    ZeroWidthElement { schema: String, field: String },
    /// Two unrelated types in one family declare the same class id.
    ClassIdCollision { family: String, id: ClassId, first: String, second: String },
}

impl fmt::Display for DeclarationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateSchema(name) => write!(f, "schema '{}' declared twice", name),
            Self::DuplicateEnum(name) => write!(f, "enum '{}' declared twice", name),
            Self::UnknownParent { schema, parent } => {
                write!(f, "schema '{}' has undeclared parent '{}'", schema, parent)
            }
            Self::AncestorCycle(schema) => write!(f, "ancestor chain of '{}' loops", schema),
            Self::MultipleOrders { schema, field, count } => {
                write!(f, "field {}.{} is marked with {} order indices", schema, field, count)
            }
            Self::DuplicateOrder { schema, field, order } => {
                write!(f, "field {}.{} has a conflicting order index {}", schema, field, order)
            }
            Self::DuplicateField { schema, field } => {
                write!(f, "field name '{}' repeats in the chain of '{}'", field, schema)
            }
            Self::UnknownSchema { schema, field, target } => {
                write!(f, "field {}.{} refers to undeclared schema '{}'", schema, field, target)
            }
            Self::UnknownEnum { schema, field, target } => {
                write!(f, "field {}.{} refers to undeclared enum '{}'", schema, field, target)
            }
            Self::UnknownFamily(name) => write!(f, "family root '{}' is not a declared schema", name),
            Self::InvalidEnumBacking { name, backing } => {
                write!(f, "enum '{}' cannot be backed by {}", name, backing)
            }
            Self::EnumValueOutOfRange { name, variant, value } => {
                write!(f, "enum {}::{} = {} does not fit its backing type", name, variant, value)
            }
            Self::DuplicateEnumValue { name, value } => {
                write!(f, "enum '{}' declares discriminant {} twice", name, value)
            }
            Self::ReservedClassId { schema } => {
                write!(f, "schema '{}' declares the reserved class id 0", schema)
            }
            Self::ClosedCycle(schema) => {
                write!(f, "schema '{}' contains itself through closed fields", schema)
            }
            Self::ZeroWidthElement { schema, field } => {
                write!(f, "field {}.{} is a container of zero-width elements", schema, field)
            }
            Self::ClassIdCollision { family, id, first, second } => write!(
                f,
                "class id {} in family '{}' is declared by both '{}' and '{}'",
                id, family, first, second
            ),
        }
    }
}

impl std::error::Error for DeclarationError {}

/// Marshalling and unmarshalling failures.
///
/// `Pending` is the only kind a caller is expected to handle locally: keep the bytes
/// and retry once more have arrived. Every other kind aborts the whole call.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The schema declarations themselves are wrong.
    Declaration(DeclarationError),
    /// More input is needed; carries the number of bytes still missing (a lower bound
    /// for strings and containers).
    Pending(usize),
    /// A polymorphic field carried a class id with no registry entry.
    UnknownClassId { family: String, id: ClassId },
    TypeMismatch { expected: String, found: String },
    /// A required value was never set before encoding.
    NotInitialized(String),
    /// A declared type has no codec path.
    UnsupportedType(String),
    /// The bytes cannot denote any value of the declared type.
    Malformed(String),
    /// A string or container is too long for its 32-bit length prefix.
    BlobTooLarge(usize),
    RecursionLimitExceeded,
}

impl Error {
    /// Bytes still missing when the error is `Pending`.
    pub fn missing(&self) -> Option<usize> {
        match self {
            Error::Pending(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Error::Pending(_))
    }

    pub(crate) fn mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Error::TypeMismatch { expected: expected.into(), found: found.into() }
    }
}

impl From<DeclarationError> for Error {
    fn from(err: DeclarationError) -> Self {
        Error::Declaration(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Declaration(e) => write!(f, "declaration error: {}", e),
            Error::Pending(n) => write!(f, "insufficient data: {} more bytes needed", n),
            Error::UnknownClassId { family, id } => {
                write!(f, "class id {} is not registered in family '{}'", id, family)
            }
            Error::TypeMismatch { expected, found } => {
                write!(f, "type mismatch: expected {}, found {}", expected, found)
            }
            Error::NotInitialized(what) => write!(f, "{} is not initialized", what),
            Error::UnsupportedType(ty) => write!(f, "no codec for type {}", ty),
            Error::Malformed(msg) => write!(f, "malformed data: {}", msg),
            Error::BlobTooLarge(len) => write!(f, "length {} exceeds the 32-bit prefix", len),
            Error::RecursionLimitExceeded => write!(f, "value nesting exceeds the recursion limit"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Declaration(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
