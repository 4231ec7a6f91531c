//! # InvoNet
//!
//! TCP transport for the Invokers call envelope.
//!
//! The protocol has no frame header. A connection is a plain concatenation of
//! `RpcBody` encodings, and the receiver finds the boundaries by decoding: a short
//! read reports `Pending`, the bytes are kept, and the decode is retried from the same
//! start when the next chunk arrives. See [`FrameReader`].
//!
//! ```no_run
//! # async fn demo() -> invonet::Result<()> {
//! use std::sync::Arc;
//!
//! let registry = Arc::new(invorpc::registry().map_err(invopack::Error::from)?);
//! let (server, mut calls) = invonet::Server::bind(invonet::ServerConfig::default(), registry).await?;
//! tokio::spawn(server.run());
//! while let Some(call) = calls.recv().await {
//!     println!("{} from peer {}", call.body.method, call.peer);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod reader;
pub mod server;

pub use client::Client;
pub use config::ServerConfig;
pub use error::NetError;
pub use error::Result;
pub use reader::FrameReader;
pub use server::Inbound;
pub use server::PeerId;
pub use server::Server;
pub use server::ServerHandle;
