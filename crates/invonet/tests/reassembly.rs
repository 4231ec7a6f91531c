use anyhow::Result;
use invopack::ClassId;
use invopack::Encoder;
use invopack::Registry;
use invonet::FrameReader;
use invonet::NetError;
use invorpc::NetObject;
use invorpc::RpcBody;
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

fn calls() -> Vec<RpcBody> {
    vec![
        RpcBody::call(
            "test rpc call",
            [
                NetObject::Int32(10),
                NetObject::from("test argv"),
                NetObject::Bool(false),
                NetObject::Char('C'),
            ],
        ),
        RpcBody::call("ping", []),
        RpcBody::call("nested", [NetObject::from(RpcBody::call("inner", [NetObject::Double(0.5)]))]),
    ]
}

fn stream_of(registry: &Registry, bodies: &[RpcBody]) -> Result<Vec<u8>> {
    let mut enc = Encoder::new();
    for body in bodies {
        invorpc::encode_call(registry, &mut enc, body)?;
    }
    Ok(enc.into_bytes())
}

fn drain(reader: &mut FrameReader, registry: &Registry, out: &mut Vec<RpcBody>) -> Result<()> {
    while let Some(body) = reader.next_call(registry)? {
        out.push(body);
    }
    Ok(())
}

#[test]
fn random_chunks_reassemble() -> Result<()> {
    let registry = invorpc::registry()?;
    let expected = calls();
    let bytes = stream_of(&registry, &expected)?;
    let mut rng = StdRng::seed_from_u64(0x5eed);

    for _ in 0..200 {
        let mut reader = FrameReader::new(bytes.len());
        let mut received = Vec::new();
        let mut rest = bytes.as_slice();
        while !rest.is_empty() {
            let take = rng.gen_range(1..=rest.len().min(24));
            let (chunk, tail) = rest.split_at(take);
            reader.push(chunk)?;
            drain(&mut reader, &registry, &mut received)?;
            rest = tail;
        }
        assert_eq!(received, expected);
        assert_eq!(reader.pending(), 0);
        assert_eq!(reader.offset(), bytes.len() as u64);
    }
    Ok(())
}

#[test]
fn single_bytes_reassemble() -> Result<()> {
    let registry = invorpc::registry()?;
    let expected = calls();
    let bytes = stream_of(&registry, &expected)?;

    let mut reader = FrameReader::new(64);
    let mut received = Vec::new();
    for byte in &bytes {
        reader.push(std::slice::from_ref(byte))?;
        drain(&mut reader, &registry, &mut received)?;
    }
    assert_eq!(received, expected);
    Ok(())
}

#[test]
fn incomplete_body_is_kept() -> Result<()> {
    let registry = invorpc::registry()?;
    let bytes = stream_of(&registry, &calls()[..1])?;

    let mut reader = FrameReader::new(1024);
    reader.push(&bytes[..bytes.len() - 1])?;
    assert!(reader.next_call(&registry)?.is_none());
    assert_eq!(reader.pending(), bytes.len() - 1);
    assert_eq!(reader.offset(), 0);

    reader.push(&bytes[bytes.len() - 1..])?;
    assert!(reader.next_call(&registry)?.is_some());
    assert!(reader.next_call(&registry)?.is_none());
    Ok(())
}

#[test]
fn backlog_over_limit_is_rejected() {
    let mut reader = FrameReader::new(16);
    assert!(reader.push(&[0u8; 10]).is_ok());
    let result = reader.push(&[0u8; 7]);
    assert!(matches!(result, Err(NetError::BufferLimit { pending: 17, limit: 16 })));
    assert_eq!(reader.pending(), 10);
}

#[test]
fn unknown_class_id_is_fatal() -> Result<()> {
    let registry = invorpc::registry()?;
    let mut enc = Encoder::new();
    enc.u16(0);
    enc.str("m")?;
    enc.count(1)?;
    enc.class_id(ClassId(99));

    let mut reader = FrameReader::new(1024);
    reader.push(enc.as_bytes())?;
    let result = reader.next_call(&registry);
    assert!(matches!(
        result,
        Err(NetError::Codec(invopack::Error::UnknownClassId { id: ClassId(99), .. }))
    ));
    Ok(())
}
