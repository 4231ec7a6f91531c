//! # Stream Reassembly
//!
//! TCP delivers bytes, not frames, and the protocol has no length prefix. A
//! `FrameReader` therefore keeps every undecoded byte and simply retries the decode
//! from the first of them whenever more arrive:
//!
//! - `Pending`: keep the remainder and wait;
//! - success: drop the consumed prefix and try again for the next frame;
//! - anything else: the stream cannot be resynchronised and must be dropped.

use invopack::Decoder;
use invopack::Registry;
use invopack::StreamBuffer;
use invorpc::RpcBody;
use tracing::debug;

use crate::error::NetError;
use crate::error::Result;

#[derive(Debug)]
pub struct FrameReader {
    buffer: StreamBuffer,
    max_pending: usize,
}

impl FrameReader {
    pub fn new(max_pending: usize) -> Self {
        Self {
            buffer: StreamBuffer::new(),
            max_pending,
        }
    }

    /// Appends received bytes. Fails once the undecoded backlog would pass the ceiling.
    pub fn push(&mut self, bytes: &[u8]) -> Result<()> {
        let pending = self.buffer.len() + bytes.len();
        if pending > self.max_pending {
            return Err(NetError::BufferLimit {
                pending,
                limit: self.max_pending,
            });
        }
        self.buffer.extend(bytes);
        Ok(())
    }

    /// Decodes the next complete frame with `decode`, or returns `None` until enough
    /// bytes have arrived.
    pub fn next_frame<T>(
        &mut self,
        decode: impl FnOnce(&mut Decoder<'_>) -> invopack::Result<T>,
    ) -> Result<Option<T>> {
        if self.buffer.is_empty() {
            return Ok(None);
        }
        let mut dec = Decoder::with_cursor(self.buffer.cursor());
        match decode(&mut dec) {
            Ok(frame) => {
                let consumed = dec.pos();
                self.buffer.mark_consumed(consumed);
                self.buffer.compact();
                Ok(Some(frame))
            }
            Err(invopack::Error::Pending(_)) => Ok(None),
            Err(e) => {
                debug!(offset = self.offset(), error = %e, "undecodable frame");
                Err(NetError::Codec(e))
            }
        }
    }

    pub fn next_call(&mut self, registry: &Registry) -> Result<Option<RpcBody>> {
        self.next_frame(|dec| invorpc::decode_call(registry, dec))
    }

    /// Undecoded bytes currently held.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Stream offset of the first undecoded byte.
    pub fn offset(&self) -> u64 {
        self.buffer.cursor().absolute_pos()
    }
}
