//! # InvoRPC
//!
//! The call envelope of the Invokers protocol, declared as ordinary invopack schemas.
//!
//! ## Layout
//!
//! An `RpcBody` is a closed `RpcHeader`, the method name, and a closed `RpcArgs` whose
//! arguments are open `NetObject` fields. Every argument therefore travels as a class id
//! followed by the fields of its concrete type.
//!
//! The envelope carries calls only. There is no dispatch, no sequence number and no
//! reply frame.

use invopack::Decoder;
use invopack::Encoder;
use invopack::Registry;
use invopack::Result;
use tracing::trace;

pub mod schemas;
pub mod envelope;

pub use envelope::NetMsgType;
pub use envelope::NetObject;
pub use envelope::RpcArgs;
pub use envelope::RpcBody;
pub use envelope::RpcHeader;

pub use schemas::declarations;
pub use schemas::registry;

#[cfg(test)]
mod tests;

/// Appends one call body.
pub fn encode_call(registry: &Registry, enc: &mut Encoder, body: &RpcBody) -> Result<()> {
    registry.encode_into(enc, body)?;
    trace!(method = %body.method, argc = body.args.argvs.len(), bytes = enc.len(), "encoded call");
    Ok(())
}

/// Reads one call body. On `Error::Pending` the caller keeps its bytes and retries
/// from the same start once more have arrived.
pub fn decode_call(registry: &Registry, dec: &mut Decoder<'_>) -> Result<RpcBody> {
    let body: RpcBody = registry.decode(dec)?;
    trace!(method = %body.method, argc = body.args.argvs.len(), "decoded call");
    Ok(body)
}
