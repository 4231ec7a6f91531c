//! Minimal peer for talking to a server: writes whole call bodies and reads them back
//! through the same reassembly path the server uses.

use std::net::SocketAddr;
use std::sync::Arc;

use invopack::Encoder;
use invopack::Registry;
use invorpc::RpcBody;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::debug;

use crate::config::DEFAULT_MAX_PENDING;
use crate::config::DEFAULT_READ_CHUNK;
use crate::error::Result;
use crate::reader::FrameReader;

pub struct Client {
    stream: TcpStream,
    registry: Arc<Registry>,
    reader: FrameReader,
    chunk: Vec<u8>,
}

impl Client {
    pub async fn connect(addr: SocketAddr, registry: Arc<Registry>) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        debug!(%addr, "connected");
        Ok(Self {
            stream,
            registry,
            reader: FrameReader::new(DEFAULT_MAX_PENDING),
            chunk: vec![0u8; DEFAULT_READ_CHUNK],
        })
    }

    pub async fn send(&mut self, body: &RpcBody) -> Result<()> {
        let mut enc = Encoder::new();
        invorpc::encode_call(&self.registry, &mut enc, body)?;
        self.send_raw(enc.as_bytes()).await
    }

    /// Writes bytes as-is. The caller is responsible for them forming valid bodies.
    pub async fn send_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.stream.write_all(bytes).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Waits for the next call body. `None` once the server closes the connection.
    pub async fn recv(&mut self) -> Result<Option<RpcBody>> {
        loop {
            if let Some(body) = self.reader.next_call(&self.registry)? {
                return Ok(Some(body));
            }
            let n = self.stream.read(&mut self.chunk).await?;
            if n == 0 {
                return Ok(None);
            }
            self.reader.push(&self.chunk[..n])?;
        }
    }

    pub async fn close(mut self) -> Result<()> {
        self.stream.shutdown().await?;
        Ok(())
    }
}
