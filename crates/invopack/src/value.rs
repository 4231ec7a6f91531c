//! # Dynamic Values
//!
//! `Value` is what the codec reads and writes. Which variant is legal for a field is
//! decided by the field's declared `WireType`, never by the value itself.

use crate::macros::for_each_copy_value;
use crate::macros::value_accessor;
use crate::types::Error;
use crate::types::Result;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A field that was never set.
    Null,
    I32(i32),
    U32(u32),
    I16(i16),
    U16(u16),
    Char(char),
    Byte(u8),
    Bool(bool),
    F32(f32),
    F64(f64),
    Str(String),
    /// An enumeration discriminant.
    Enum(i64),
    /// The value of a closed field.
    Record(Record),
    /// The value of an open field; `None` is absent.
    Object(Option<Box<Record>>),
    Seq(Vec<Value>),
    /// Key-value pairs in insertion order.
    Map(Vec<(Value, Value)>),
}

impl Value {
    pub fn absent() -> Self {
        Value::Object(None)
    }

    pub fn object(record: Record) -> Self {
        Value::Object(Some(Box::new(record)))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::I32(_) => "i32",
            Value::U32(_) => "u32",
            Value::I16(_) => "i16",
            Value::U16(_) => "u16",
            Value::Char(_) => "char",
            Value::Byte(_) => "byte",
            Value::Bool(_) => "bool",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::Str(_) => "string",
            Value::Enum(_) => "enum",
            Value::Record(_) => "record",
            Value::Object(_) => "object",
            Value::Seq(_) => "seq",
            Value::Map(_) => "map",
        }
    }

    pub fn as_str(&self) -> Result<&str> {
        match self {
            Value::Str(s) => Ok(s),
            other => Err(Error::mismatch("string", other.kind())),
        }
    }

    pub fn into_string(self) -> Result<String> {
        match self {
            Value::Str(s) => Ok(s),
            other => Err(Error::mismatch("string", other.kind())),
        }
    }

    pub fn as_enum(&self) -> Result<i64> {
        match self {
            Value::Enum(v) => Ok(*v),
            other => Err(Error::mismatch("enum", other.kind())),
        }
    }

    pub fn as_record(&self) -> Result<&Record> {
        match self {
            Value::Record(r) => Ok(r),
            other => Err(Error::mismatch("record", other.kind())),
        }
    }

    pub fn into_record(self) -> Result<Record> {
        match self {
            Value::Record(r) => Ok(r),
            other => Err(Error::mismatch("record", other.kind())),
        }
    }

    /// An unset open field reads as absent.
    pub fn into_object(self) -> Result<Option<Record>> {
        match self {
            Value::Object(obj) => Ok(obj.map(|b| *b)),
            Value::Null => Ok(None),
            other => Err(Error::mismatch("object", other.kind())),
        }
    }

    pub fn into_seq(self) -> Result<Vec<Value>> {
        match self {
            Value::Seq(items) => Ok(items),
            other => Err(Error::mismatch("seq", other.kind())),
        }
    }

    pub fn into_map(self) -> Result<Vec<(Value, Value)>> {
        match self {
            Value::Map(pairs) => Ok(pairs),
            other => Err(Error::mismatch("map", other.kind())),
        }
    }
}

for_each_copy_value!(value_accessor);

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<Record> for Value {
    fn from(r: Record) -> Self {
        Value::Record(r)
    }
}

/// An instance of a schema: its name plus every field of its ancestor chain, marked
/// or not, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    schema: String,
    fields: Vec<(String, Value)>,
}

impl Record {
    /// A record with no fields set. `Registry::blank` builds a fully defaulted one.
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            fields: Vec::new(),
        }
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.fields.iter_mut().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Replaces the field if present, appends it otherwise.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.get_mut(&name) {
            Some(slot) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Moves a field out, leaving `Null` behind. A missing field is an error.
    pub fn take(&mut self, name: &str) -> Result<Value> {
        let schema = &self.schema;
        self.fields
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, v)| std::mem::replace(v, Value::Null))
            .ok_or_else(|| Error::NotInitialized(format!("{}.{}", schema, name)))
    }

    pub fn expect_schema(&self, name: &str) -> Result<()> {
        if self.schema == name {
            Ok(())
        } else {
            Err(Error::mismatch(name, self.schema.as_str()))
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
