use crate::*;
use crate::schemas::*;
use anyhow::Result;
use invopack::ClassId;
use invopack::DeclarationError;
use invopack::Decoder;
use invopack::Encoder;
use invopack::Error;
use invopack::Prim;
use invopack::Record;
use invopack::Registry;
use invopack::Schema;
use invopack::SchemaDecl;
use invopack::Value;

fn sample_call() -> RpcBody {
    RpcBody::call(
        "test rpc call",
        [
            NetObject::Int32(10),
            NetObject::from("test argv"),
            NetObject::Bool(false),
            NetObject::Char('C'),
        ],
    )
}

fn roundtrip(registry: &Registry, body: &RpcBody) -> Result<RpcBody> {
    let mut enc = Encoder::new();
    encode_call(registry, &mut enc, body)?;
    let mut dec = Decoder::new(enc.as_bytes());
    let decoded = decode_call(registry, &mut dec)?;
    assert_eq!(dec.remaining(), 0);
    Ok(decoded)
}

#[test]
#[cfg(not(feature = "little-endian-wire"))]
fn test_rpc_call_wire_layout() -> Result<()> {
    let registry = registry()?;
    let body = sample_call();

    let mut expected: Vec<u8> = vec![0x00, 0x00];
    expected.extend_from_slice(&[0x00, 0x00, 0x00, 0x0D]);
    expected.extend_from_slice(b"test rpc call");
    expected.extend_from_slice(&[0x00, 0x00, 0x00, 0x04]);
    expected.extend_from_slice(&[0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x0A]);
    expected.extend_from_slice(&[0x00, 0x00, 0x00, 0x0A, 0x00, 0x00, 0x00, 0x09]);
    expected.extend_from_slice(b"test argv");
    expected.extend_from_slice(&[0x00, 0x00, 0x00, 0x07, 0x00]);
    expected.extend_from_slice(&[0x00, 0x00, 0x00, 0x05, 0x00, 0x43]);

    let mut enc = Encoder::new();
    encode_call(&registry, &mut enc, &body)?;
    assert_eq!(enc.as_bytes(), expected.as_slice());
    Ok(())
}

#[test]
fn test_rpc_call_roundtrip() -> Result<()> {
    let registry = registry()?;
    let body = sample_call();
    let decoded = roundtrip(&registry, &body)?;

    assert_eq!(decoded.header.msg_type, NetMsgType::Rpc);
    assert_eq!(decoded.method, "test rpc call");
    assert_eq!(decoded, body);
    Ok(())
}

#[test]
fn test_every_wrapper_roundtrips() -> Result<()> {
    let registry = registry()?;
    let body = RpcBody::call(
        "wrappers",
        [
            NetObject::Int32(i32::MIN),
            NetObject::UInt32(u32::MAX),
            NetObject::Int16(-2),
            NetObject::UInt16(65_000),
            NetObject::Char('\u{00e9}'),
            NetObject::Byte(0xFE),
            NetObject::Bool(true),
            NetObject::Single(1.5),
            NetObject::Double(-0.25),
            NetObject::String(String::new()),
            NetObject::Header(RpcHeader::default()),
            NetObject::Args(RpcArgs::new([NetObject::Int16(4)])),
        ],
    );
    assert_eq!(roundtrip(&registry, &body)?, body);
    Ok(())
}

#[test]
#[cfg(not(feature = "little-endian-wire"))]
fn test_header_is_two_bytes() -> Result<()> {
    let registry = registry()?;
    assert_eq!(registry.encode(&RpcHeader::default())?, vec![0x00, 0x00]);
    Ok(())
}

#[test]
#[cfg(not(feature = "little-endian-wire"))]
fn test_absent_argument() -> Result<()> {
    let registry = registry()?;
    let args = RpcArgs {
        argvs: vec![None, Some(NetObject::Int32(1))],
    };

    let bytes = registry.encode(&args)?;
    assert_eq!(
        bytes,
        vec![
            0x00, 0x00, 0x00, 0x02, // count
            0x00, 0x00, 0x00, 0x00, // absent
            0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01,
        ]
    );

    let decoded: RpcArgs = registry.decode(&mut Decoder::new(&bytes))?;
    assert_eq!(decoded, args);
    Ok(())
}

#[test]
fn test_call_as_argument() -> Result<()> {
    let registry = registry()?;
    let inner = RpcBody::call("inner", [NetObject::Double(2.0)]);
    let outer = RpcBody::call("outer", [NetObject::from(inner), NetObject::from(true)]);

    let decoded = roundtrip(&registry, &outer)?;
    match &decoded.args.argvs[0] {
        Some(NetObject::Call(body)) => assert_eq!(body.method, "inner"),
        other => panic!("expected nested call, got {:?}", other),
    }
    assert_eq!(decoded, outer);
    Ok(())
}

#[test]
fn test_class_ids_match_declarations() -> Result<()> {
    let registry = registry()?;
    let family = registry
        .family(NET_OBJECT)
        .ok_or_else(|| anyhow::anyhow!("NetObject family missing"))?;
    assert_eq!(family.len(), 13);

    let samples = [
        NetObject::Int32(0),
        NetObject::UInt32(0),
        NetObject::Int16(0),
        NetObject::UInt16(0),
        NetObject::Char('a'),
        NetObject::Byte(0),
        NetObject::Bool(false),
        NetObject::Single(0.0),
        NetObject::Double(0.0),
        NetObject::String(String::new()),
        NetObject::Header(RpcHeader::default()),
        NetObject::Args(RpcArgs::default()),
        NetObject::from(RpcBody::default()),
    ];
    for obj in &samples {
        assert_eq!(family.class_of(obj.schema_name()), Some(obj.class_id()));
        assert_eq!(family.resolve(obj.class_id()), Some(obj.schema_name()));
    }
    assert_eq!(family.class_of(NET_OBJECT), None);
    Ok(())
}

#[test]
fn test_wrapper_ids_follow_the_declaration_table() -> Result<()> {
    let registry = registry()?;
    let family = registry
        .family(NET_OBJECT)
        .ok_or_else(|| anyhow::anyhow!("NetObject family missing"))?;
    for (name, id, _) in WRAPPERS {
        assert_eq!(class_id_of(name), Some(id));
        assert_eq!(family.class_of(name), Some(ClassId(id)));
    }
    assert_eq!(NetObject::Byte(1).class_id(), ClassId(6));
    assert_eq!(class_id_of(NET_OBJECT), None);
    assert_eq!(class_id_of("NetPoint"), None);
    Ok(())
}

#[test]
fn test_truncated_call_is_pending() -> Result<()> {
    let registry = registry()?;
    let mut enc = Encoder::new();
    encode_call(&registry, &mut enc, &sample_call())?;
    let bytes = enc.as_bytes();

    for cut in 0..bytes.len() {
        let result = decode_call(&registry, &mut Decoder::new(&bytes[..cut]));
        assert!(matches!(result, Err(Error::Pending(_))), "cut {}", cut);
    }
    Ok(())
}

#[test]
fn test_family_accepts_new_members() -> Result<()> {
    let registry = declarations()
        .schema(
            SchemaDecl::new("NetPoint")
                .extends(NET_OBJECT)
                .class_id(40)
                .field(0, "x", Prim::I32)
                .field(1, "y", Prim::I32),
        )
        .build()?;

    let point = registry.blank("NetPoint")?.with("x", 3).with("y", 4);
    let args = Record::new(RPC_ARGS).with("argvs", Value::Seq(vec![Value::object(point.clone())]));
    let bytes = registry.marshal(&args)?;

    let decoded = registry.unmarshal(RPC_ARGS, &mut Decoder::new(&bytes))?;
    assert_eq!(decoded.get("argvs"), Some(&Value::Seq(vec![Value::object(point)])));

    let typed = RpcArgs::from_record(decoded);
    assert!(matches!(typed, Err(Error::TypeMismatch { .. })));
    Ok(())
}

#[test]
fn test_reusing_a_wrapper_id_is_rejected() {
    let result = declarations()
        .schema(
            SchemaDecl::new("NetInt64")
                .extends(NET_OBJECT)
                .class_id(1)
                .field(0, WRAPPED, Prim::I32),
        )
        .build();
    assert!(matches!(
        result,
        Err(DeclarationError::ClassIdCollision { id: ClassId(1), .. })
    ));
}
