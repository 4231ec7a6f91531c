//! # Envelope Declarations
//!
//! The `NetObject` family and the three envelope schemas. Class ids are part of the
//! wire contract and must never be renumbered.

use invopack::DeclarationError;
use invopack::EnumDecl;
use invopack::Prim;
use invopack::Registry;
use invopack::RegistryBuilder;
use invopack::SchemaDecl;
use invopack::WireType;

pub const NET_OBJECT: &str = "NetObject";
pub const NET_MSG_TYPE: &str = "NetMsgType";

pub const NET_INT32: &str = "NetInt32";
pub const NET_UINT32: &str = "NetUInt32";
pub const NET_INT16: &str = "NetInt16";
pub const NET_UINT16: &str = "NetUInt16";
pub const NET_CHAR: &str = "NetChar";
pub const NET_BYTE: &str = "NetByte";
pub const NET_BOOL: &str = "NetBool";
pub const NET_SINGLE: &str = "NetSingle";
pub const NET_DOUBLE: &str = "NetDouble";
pub const NET_STRING: &str = "NetString";

pub const RPC_HEADER: &str = "RpcHeader";
pub const RPC_ARGS: &str = "RpcArgs";
pub const RPC_BODY: &str = "RpcBody";

/// Name of the single field carried by every primitive wrapper.
pub const WRAPPED: &str = "value";

/// Primitive wrappers: schema name, class id, wrapped primitive.
pub const WRAPPERS: [(&str, i32, Prim); 10] = [
    (NET_INT32, 1, Prim::I32),
    (NET_UINT32, 2, Prim::U32),
    (NET_INT16, 3, Prim::I16),
    (NET_UINT16, 4, Prim::U16),
    (NET_CHAR, 5, Prim::Char),
    (NET_BYTE, 6, Prim::Byte),
    (NET_BOOL, 7, Prim::Bool),
    (NET_SINGLE, 8, Prim::F32),
    (NET_DOUBLE, 9, Prim::F64),
    (NET_STRING, 10, Prim::Str),
];

pub const RPC_HEADER_ID: i32 = 11;
pub const RPC_ARGS_ID: i32 = 12;
pub const RPC_BODY_ID: i32 = 13;

/// Class id declared by a built-in `NetObject` member.
pub fn class_id_of(schema: &str) -> Option<i32> {
    match schema {
        RPC_HEADER => Some(RPC_HEADER_ID),
        RPC_ARGS => Some(RPC_ARGS_ID),
        RPC_BODY => Some(RPC_BODY_ID),
        _ => WRAPPERS
            .iter()
            .find(|(name, _, _)| *name == schema)
            .map(|(_, id, _)| *id),
    }
}

/// Every envelope declaration. Merge further `NetObject` subtypes into this before
/// building to extend the family.
pub fn declarations() -> RegistryBuilder {
    let mut builder = Registry::builder()
        .enumeration(EnumDecl::new(NET_MSG_TYPE, Prim::U16).variant("Rpc", 0))
        .schema(SchemaDecl::new(NET_OBJECT).abstract_type())
        .family(NET_OBJECT);

    for (name, id, prim) in WRAPPERS {
        builder = builder.schema(
            SchemaDecl::new(name)
                .extends(NET_OBJECT)
                .class_id(id)
                .field(0, WRAPPED, prim),
        );
    }

    builder
        .schema(
            SchemaDecl::new(RPC_HEADER)
                .extends(NET_OBJECT)
                .class_id(RPC_HEADER_ID)
                .field(0, "msg_type", WireType::enumeration(NET_MSG_TYPE)),
        )
        .schema(
            SchemaDecl::new(RPC_ARGS)
                .extends(NET_OBJECT)
                .class_id(RPC_ARGS_ID)
                .field(0, "argvs", WireType::seq(WireType::open(NET_OBJECT))),
        )
        .schema(
            SchemaDecl::new(RPC_BODY)
                .extends(NET_OBJECT)
                .class_id(RPC_BODY_ID)
                .field(0, "header", WireType::closed(RPC_HEADER))
                .field(1, "method", Prim::Str)
                .field(2, "args", WireType::closed(RPC_ARGS)),
        )
}

/// Builds a registry holding only the envelope declarations.
pub fn registry() -> Result<Registry, DeclarationError> {
    declarations().build()
}
