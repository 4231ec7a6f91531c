//! # Typed Envelope
//!
//! Rust-side views of the `NetObject` family. `NetObject` is a closed sum over every
//! registered member; an absent argument is `None`.

use invopack::ClassId;
use invopack::Error;
use invopack::Record;
use invopack::Result;
use invopack::Schema;
use invopack::Value;

use crate::schemas::*;

/// Message kinds carried in `RpcHeader`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u16)]
pub enum NetMsgType {
    #[default]
    Rpc = 0,
}

impl NetMsgType {
    pub fn discriminant(self) -> i64 {
        self as u16 as i64
    }

    pub fn from_discriminant(value: i64) -> Result<Self> {
        match value {
            0 => Ok(NetMsgType::Rpc),
            other => Err(Error::TypeMismatch {
                expected: NET_MSG_TYPE.into(),
                found: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RpcHeader {
    pub msg_type: NetMsgType,
}

impl Schema for RpcHeader {
    const NAME: &'static str = RPC_HEADER;

    fn to_record(&self) -> Record {
        Record::new(Self::NAME).with("msg_type", Value::Enum(self.msg_type.discriminant()))
    }

    fn from_record(mut record: Record) -> Result<Self> {
        record.expect_schema(Self::NAME)?;
        let msg_type = NetMsgType::from_discriminant(record.take("msg_type")?.as_enum()?)?;
        Ok(Self { msg_type })
    }
}

/// Positional call arguments.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RpcArgs {
    pub argvs: Vec<Option<NetObject>>,
}

impl RpcArgs {
    pub fn new(args: impl IntoIterator<Item = NetObject>) -> Self {
        Self {
            argvs: args.into_iter().map(Some).collect(),
        }
    }
}

impl Schema for RpcArgs {
    const NAME: &'static str = RPC_ARGS;

    fn to_record(&self) -> Record {
        let argvs = self.argvs.iter().map(NetObject::to_value).collect();
        Record::new(Self::NAME).with("argvs", Value::Seq(argvs))
    }

    fn from_record(mut record: Record) -> Result<Self> {
        record.expect_schema(Self::NAME)?;
        let argvs = record
            .take("argvs")?
            .into_seq()?
            .into_iter()
            .map(NetObject::from_value)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { argvs })
    }
}

/// A call: header, method name, arguments.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RpcBody {
    pub header: RpcHeader,
    pub method: String,
    pub args: RpcArgs,
}

impl RpcBody {
    pub fn call(method: impl Into<String>, args: impl IntoIterator<Item = NetObject>) -> Self {
        Self {
            header: RpcHeader::default(),
            method: method.into(),
            args: RpcArgs::new(args),
        }
    }
}

impl Schema for RpcBody {
    const NAME: &'static str = RPC_BODY;

    fn to_record(&self) -> Record {
        Record::new(Self::NAME)
            .with("header", self.header.to_record())
            .with("method", self.method.as_str())
            .with("args", self.args.to_record())
    }

    fn from_record(mut record: Record) -> Result<Self> {
        record.expect_schema(Self::NAME)?;
        Ok(Self {
            header: RpcHeader::from_record(record.take("header")?.into_record()?)?,
            method: record.take("method")?.into_string()?,
            args: RpcArgs::from_record(record.take("args")?.into_record()?)?,
        })
    }
}

/// Every concrete member of the `NetObject` family.
#[derive(Debug, Clone, PartialEq)]
pub enum NetObject {
    Int32(i32),
    UInt32(u32),
    Int16(i16),
    UInt16(u16),
    Char(char),
    Byte(u8),
    Bool(bool),
    Single(f32),
    Double(f64),
    String(String),
    Header(RpcHeader),
    Args(RpcArgs),
    Call(Box<RpcBody>),
}

impl NetObject {
    pub fn schema_name(&self) -> &'static str {
        match self {
            NetObject::Int32(_) => NET_INT32,
            NetObject::UInt32(_) => NET_UINT32,
            NetObject::Int16(_) => NET_INT16,
            NetObject::UInt16(_) => NET_UINT16,
            NetObject::Char(_) => NET_CHAR,
            NetObject::Byte(_) => NET_BYTE,
            NetObject::Bool(_) => NET_BOOL,
            NetObject::Single(_) => NET_SINGLE,
            NetObject::Double(_) => NET_DOUBLE,
            NetObject::String(_) => NET_STRING,
            NetObject::Header(_) => RPC_HEADER,
            NetObject::Args(_) => RPC_ARGS,
            NetObject::Call(_) => RPC_BODY,
        }
    }

    pub fn class_id(&self) -> ClassId {
        class_id_of(self.schema_name()).map_or(ClassId::ABSENT, ClassId)
    }

    pub fn to_record(&self) -> Record {
        let wrapped = match self {
            NetObject::Int32(v) => Value::I32(*v),
            NetObject::UInt32(v) => Value::U32(*v),
            NetObject::Int16(v) => Value::I16(*v),
            NetObject::UInt16(v) => Value::U16(*v),
            NetObject::Char(v) => Value::Char(*v),
            NetObject::Byte(v) => Value::Byte(*v),
            NetObject::Bool(v) => Value::Bool(*v),
            NetObject::Single(v) => Value::F32(*v),
            NetObject::Double(v) => Value::F64(*v),
            NetObject::String(v) => Value::Str(v.clone()),
            NetObject::Header(h) => return h.to_record(),
            NetObject::Args(a) => return a.to_record(),
            NetObject::Call(b) => return b.to_record(),
        };
        Record::new(self.schema_name()).with(WRAPPED, wrapped)
    }

    pub fn from_record(mut record: Record) -> Result<Self> {
        let schema = record.schema().to_owned();
        let obj = match schema.as_str() {
            NET_INT32 => NetObject::Int32(record.take(WRAPPED)?.as_i32()?),
            NET_UINT32 => NetObject::UInt32(record.take(WRAPPED)?.as_u32()?),
            NET_INT16 => NetObject::Int16(record.take(WRAPPED)?.as_i16()?),
            NET_UINT16 => NetObject::UInt16(record.take(WRAPPED)?.as_u16()?),
            NET_CHAR => NetObject::Char(record.take(WRAPPED)?.as_char()?),
            NET_BYTE => NetObject::Byte(record.take(WRAPPED)?.as_byte()?),
            NET_BOOL => NetObject::Bool(record.take(WRAPPED)?.as_bool()?),
            NET_SINGLE => NetObject::Single(record.take(WRAPPED)?.as_f32()?),
            NET_DOUBLE => NetObject::Double(record.take(WRAPPED)?.as_f64()?),
            NET_STRING => NetObject::String(record.take(WRAPPED)?.into_string()?),
            RPC_HEADER => NetObject::Header(RpcHeader::from_record(record)?),
            RPC_ARGS => NetObject::Args(RpcArgs::from_record(record)?),
            RPC_BODY => NetObject::Call(Box::new(RpcBody::from_record(record)?)),
            other => {
                return Err(Error::TypeMismatch {
                    expected: format!("a member of {}", NET_OBJECT),
                    found: other.to_owned(),
                })
            }
        };
        Ok(obj)
    }

    /// The value of an open `NetObject` field.
    pub fn to_value(obj: &Option<NetObject>) -> Value {
        match obj {
            Some(obj) => Value::object(obj.to_record()),
            None => Value::absent(),
        }
    }

    pub fn from_value(value: Value) -> Result<Option<NetObject>> {
        value.into_object()?.map(NetObject::from_record).transpose()
    }
}

impl From<i32> for NetObject {
    fn from(v: i32) -> Self {
        NetObject::Int32(v)
    }
}

impl From<bool> for NetObject {
    fn from(v: bool) -> Self {
        NetObject::Bool(v)
    }
}

impl From<char> for NetObject {
    fn from(v: char) -> Self {
        NetObject::Char(v)
    }
}

impl From<&str> for NetObject {
    fn from(v: &str) -> Self {
        NetObject::String(v.to_owned())
    }
}

impl From<RpcBody> for NetObject {
    fn from(body: RpcBody) -> Self {
        NetObject::Call(Box::new(body))
    }
}
