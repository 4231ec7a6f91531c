//! # Listener
//!
//! Accepts TCP connections and runs one task per peer. Each task reassembles call
//! bodies from the byte stream and pushes them onto the inbound queue. Replies and
//! other outbound calls go through a per-peer writer task fed by `ServerHandle::send`.

use std::net::SocketAddr;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use invopack::Encoder;
use invopack::Registry;
use invorpc::RpcBody;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpListener;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::sync::watch;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::config::ServerConfig;
use crate::error::NetError;
use crate::error::Result;
use crate::reader::FrameReader;

pub type PeerId = u64;

const ACCEPT_BACKOFF_BASE: Duration = Duration::from_millis(10);
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// A call body received from a peer.
#[derive(Debug, Clone, PartialEq)]
pub struct Inbound {
    pub peer: PeerId,
    pub addr: SocketAddr,
    pub body: RpcBody,
}

struct Peer {
    addr: SocketAddr,
    outbound: mpsc::Sender<Vec<u8>>,
}

struct Shared {
    config: ServerConfig,
    registry: Arc<Registry>,
    peers: DashMap<PeerId, Peer>,
    shutdown: watch::Sender<bool>,
}

pub struct Server {
    listener: TcpListener,
    shared: Arc<Shared>,
    inbound: mpsc::Sender<Inbound>,
    next_peer: AtomicU64,
}

impl Server {
    /// Binds the listener. Received calls arrive on the returned queue.
    pub async fn bind(config: ServerConfig, registry: Arc<Registry>) -> Result<(Self, mpsc::Receiver<Inbound>)> {
        let listener = TcpListener::bind(config.addr).await?;
        let (inbound, queue) = mpsc::channel(config.queue_depth.max(1));
        let (shutdown, _) = watch::channel(false);
        info!(addr = %listener.local_addr()?, "server started");

        let shared = Arc::new(Shared {
            config,
            registry,
            peers: DashMap::new(),
            shutdown,
        });
        let server = Self {
            listener,
            shared,
            inbound,
            next_peer: AtomicU64::new(1),
        };
        Ok((server, queue))
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            shared: self.shared.clone(),
        }
    }

    /// Accepts connections until `ServerHandle::shutdown` is called.
    pub async fn run(self) -> Result<()> {
        let mut shutdown = self.shared.shutdown.subscribe();
        let mut failures = 0u32;
        loop {
            if *shutdown.borrow_and_update() {
                break;
            }
            tokio::select! {
                accepted = self.listener.accept() => {
                    let (stream, addr) = match accepted {
                        Ok(pair) => {
                            failures = 0;
                            pair
                        }
                        Err(e) => {
                            failures = failures.saturating_add(1);
                            let delay = accept_backoff(failures);
                            warn!(error = %e, failures, ?delay, "accept failed");
                            tokio::time::sleep(delay).await;
                            continue;
                        }
                    };
                    let id = self.next_peer.fetch_add(1, Ordering::Relaxed);
                    tokio::spawn(serve_connection(
                        self.shared.clone(),
                        self.inbound.clone(),
                        id,
                        stream,
                        addr,
                    ));
                }
                _ = shutdown.changed() => {}
            }
        }
        info!("server stopped");
        Ok(())
    }
}

/// Pause after the `failures`-th consecutive accept error: doubling from 10ms, capped
/// at one second.
fn accept_backoff(failures: u32) -> Duration {
    let exponent = failures.saturating_sub(1).min(7);
    (ACCEPT_BACKOFF_BASE * (1 << exponent)).min(ACCEPT_BACKOFF_MAX)
}

/// Cloneable control surface of a running server.
#[derive(Clone)]
pub struct ServerHandle {
    shared: Arc<Shared>,
}

impl ServerHandle {
    pub fn peers(&self) -> Vec<(PeerId, SocketAddr)> {
        self.shared
            .peers
            .iter()
            .map(|entry| (*entry.key(), entry.value().addr))
            .collect()
    }

    pub fn peer_count(&self) -> usize {
        self.shared.peers.len()
    }

    /// Queues a call body for delivery to one peer.
    pub async fn send(&self, peer: PeerId, body: &RpcBody) -> Result<()> {
        let mut enc = Encoder::new();
        invorpc::encode_call(&self.shared.registry, &mut enc, body)?;
        let outbound = self
            .shared
            .peers
            .get(&peer)
            .map(|entry| entry.outbound.clone())
            .ok_or(NetError::UnknownPeer(peer))?;
        outbound.send(enc.into_bytes()).await.map_err(|_| NetError::Closed)
    }

    /// Stops accepting and closes every connection.
    pub fn shutdown(&self) {
        self.shared.shutdown.send_replace(true);
    }
}

async fn serve_connection(
    shared: Arc<Shared>,
    inbound: mpsc::Sender<Inbound>,
    id: PeerId,
    stream: TcpStream,
    addr: SocketAddr,
) {
    let (mut read_half, mut write_half) = stream.into_split();
    let (outbound, mut outbound_queue) = mpsc::channel::<Vec<u8>>(shared.config.queue_depth.max(1));
    shared.peers.insert(id, Peer { addr, outbound });
    info!(peer = id, %addr, "peer connected");

    let writer = tokio::spawn(async move {
        while let Some(bytes) = outbound_queue.recv().await {
            write_half.write_all(&bytes).await?;
        }
        write_half.shutdown().await
    });

    let result = read_calls(&shared, &inbound, id, addr, &mut read_half).await;
    shared.peers.remove(&id);
    match result {
        Ok(()) => info!(peer = id, %addr, "peer disconnected"),
        Err(e) => warn!(peer = id, %addr, error = %e, "dropping connection"),
    }

    match writer.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!(peer = id, error = %e, "writer stopped"),
        Err(e) => warn!(peer = id, error = %e, "writer task failed"),
    }
}

async fn read_calls(
    shared: &Shared,
    inbound: &mpsc::Sender<Inbound>,
    id: PeerId,
    addr: SocketAddr,
    read_half: &mut OwnedReadHalf,
) -> Result<()> {
    let mut reader = FrameReader::new(shared.config.max_pending);
    let mut chunk = vec![0u8; shared.config.read_chunk.max(1)];
    let mut shutdown = shared.shutdown.subscribe();

    loop {
        if *shutdown.borrow_and_update() {
            return Ok(());
        }
        let n = tokio::select! {
            read = read_half.read(&mut chunk) => read?,
            _ = shutdown.changed() => continue,
        };
        if n == 0 {
            if reader.pending() > 0 {
                warn!(peer = id, pending = reader.pending(), "peer closed mid-frame");
            }
            return Ok(());
        }

        reader.push(&chunk[..n])?;
        while let Some(body) = reader.next_call(&shared.registry)? {
            debug!(peer = id, method = %body.method, argc = body.args.argvs.len(), "call received");
            inbound
                .send(Inbound { peer: id, addr, body })
                .await
                .map_err(|_| NetError::Closed)?;
        }
    }
}
