//! # Schema Declarations
//!
//! Schemas are declared once at startup with a small builder API and handed to
//! `Registry::build`, which validates them and derives the wire layout.
//!
//! ```
//! use invopack::schema::{SchemaDecl, WireType};
//! use invopack::types::Prim;
//!
//! let point = SchemaDecl::new("Point")
//!     .class_id(40)
//!     .field(0, "x", WireType::Primitive(Prim::I32))
//!     .field(1, "y", WireType::Primitive(Prim::I32))
//!     .unmarked("dirty", WireType::Primitive(Prim::Bool));
//! assert_eq!(point.fields.len(), 3);
//! ```

use std::fmt;

use crate::types::ClassId;
use crate::types::Prim;

/// The declared type of a field. Encoding and decoding dispatch on this, never on the
/// runtime shape of a value, except for `Open` fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WireType {
    Primitive(Prim),
    /// A declared enumeration, encoded as its backing primitive.
    Enum(String),
    /// A nested schema whose concrete type is fixed.
    Closed(String),
    /// Any registered member of the family rooted at the named schema, or absent.
    Open(String),
    Seq(Box<WireType>),
    Map(Box<WireType>, Box<WireType>),
}

impl WireType {
    pub fn enumeration(name: impl Into<String>) -> Self {
        WireType::Enum(name.into())
    }

    pub fn closed(schema: impl Into<String>) -> Self {
        WireType::Closed(schema.into())
    }

    pub fn open(family_root: impl Into<String>) -> Self {
        WireType::Open(family_root.into())
    }

    pub fn seq(element: WireType) -> Self {
        WireType::Seq(Box::new(element))
    }

    pub fn map(key: WireType, value: WireType) -> Self {
        WireType::Map(Box::new(key), Box::new(value))
    }
}

impl From<Prim> for WireType {
    fn from(p: Prim) -> Self {
        WireType::Primitive(p)
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireType::Primitive(p) => write!(f, "{}", p),
            WireType::Enum(name) => write!(f, "enum {}", name),
            WireType::Closed(name) => write!(f, "{}", name),
            WireType::Open(name) => write!(f, "open {}", name),
            WireType::Seq(inner) => write!(f, "seq<{}>", inner),
            WireType::Map(k, v) => write!(f, "map<{}, {}>", k, v),
        }
    }
}

/// One declared field. A field without an order index is bookkeeping and never
/// reaches the wire; a field with more than one is a declaration error.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: String,
    pub wire: WireType,
    pub orders: Vec<i32>,
}

impl FieldDecl {
    pub fn new(name: impl Into<String>, wire: impl Into<WireType>) -> Self {
        Self {
            name: name.into(),
            wire: wire.into(),
            orders: Vec::new(),
        }
    }

    /// Marks the field for marshalling at `order` within its declaring schema.
    pub fn order(mut self, order: i32) -> Self {
        self.orders.push(order);
        self
    }

    pub fn is_marked(&self) -> bool {
        !self.orders.is_empty()
    }
}

/// A composite schema type.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDecl {
    pub name: String,
    pub parent: Option<String>,
    /// The class id this schema declares for itself. Inheriting one is not enough to
    /// be registered in a family.
    pub class_id: Option<ClassId>,
    /// Abstract schemas can root a family but are never instantiated from the wire.
    pub is_abstract: bool,
    pub fields: Vec<FieldDecl>,
}

impl SchemaDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            class_id: None,
            is_abstract: false,
            fields: Vec::new(),
        }
    }

    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn class_id(mut self, id: i32) -> Self {
        self.class_id = Some(ClassId(id));
        self
    }

    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Adds a marshalled field at `order`.
    pub fn field(self, order: i32, name: impl Into<String>, wire: impl Into<WireType>) -> Self {
        self.with_field(FieldDecl::new(name, wire).order(order))
    }

    /// Adds a field that lives on the record but is never marshalled.
    pub fn unmarked(self, name: impl Into<String>, wire: impl Into<WireType>) -> Self {
        self.with_field(FieldDecl::new(name, wire))
    }

    pub fn with_field(mut self, field: FieldDecl) -> Self {
        self.fields.push(field);
        self
    }
}

/// An enumeration backed by an integer primitive.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumDecl {
    pub name: String,
    pub backing: Prim,
    pub variants: Vec<(String, i64)>,
}

impl EnumDecl {
    pub fn new(name: impl Into<String>, backing: Prim) -> Self {
        Self {
            name: name.into(),
            backing,
            variants: Vec::new(),
        }
    }

    pub fn variant(mut self, name: impl Into<String>, value: i64) -> Self {
        self.variants.push((name.into(), value));
        self
    }

    pub fn variant_name(&self, value: i64) -> Option<&str> {
        self.variants
            .iter()
            .find(|(_, v)| *v == value)
            .map(|(name, _)| name.as_str())
    }

    pub fn value_of(&self, name: &str) -> Option<i64> {
        self.variants.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }

    /// Discriminant of a freshly constructed value: the first declared variant.
    pub fn default_value(&self) -> i64 {
        self.variants.first().map(|(_, v)| *v).unwrap_or(0)
    }
}

/// A validated marshalled field, positioned within a schema's full wire layout.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub wire: WireType,
    pub order: i32,
    /// The schema in the ancestor chain that declared the field.
    pub owner: String,
}
