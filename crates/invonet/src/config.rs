//! Listener settings with environment overrides.

use std::net::SocketAddr;
use std::str::FromStr;

use crate::error::NetError;
use crate::error::Result;

pub const DEFAULT_PORT: u16 = 14932;
pub const DEFAULT_READ_CHUNK: usize = 2048;
pub const DEFAULT_MAX_PENDING: usize = 1 << 20;
pub const DEFAULT_QUEUE_DEPTH: usize = 64;

pub const ENV_ADDR: &str = "INVOKERS_ADDR";
pub const ENV_READ_CHUNK: &str = "INVOKERS_READ_CHUNK";
pub const ENV_MAX_PENDING: &str = "INVOKERS_MAX_PENDING";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    /// Bytes requested from the socket per read.
    pub read_chunk: usize,
    /// Ceiling on undecoded bytes held for one connection.
    pub max_pending: usize,
    /// Capacity of the inbound call queue.
    pub queue_depth: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            read_chunk: DEFAULT_READ_CHUNK,
            max_pending: DEFAULT_MAX_PENDING,
            queue_depth: DEFAULT_QUEUE_DEPTH,
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `INVOKERS_ADDR`, `INVOKERS_READ_CHUNK` and
    /// `INVOKERS_MAX_PENDING` when they are set.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(addr) = parse(&lookup, ENV_ADDR)? {
            config.addr = addr;
        }
        let chunk: Option<usize> = parse(&lookup, ENV_READ_CHUNK)?;
        if let Some(chunk) = chunk {
            config.read_chunk = chunk.max(1);
        }
        if let Some(limit) = parse(&lookup, ENV_MAX_PENDING)? {
            config.max_pending = limit;
        }
        Ok(config)
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }
}

fn parse<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<Option<T>> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| NetError::Config { key, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_listen_on_local_port() {
        let config = ServerConfig::default();
        assert_eq!(config.addr.port(), 14932);
        assert_eq!(config.read_chunk, 2048);
    }

    #[test]
    fn overrides_apply() -> Result<()> {
        let config = ServerConfig::from_lookup(|key| match key {
            ENV_ADDR => Some("0.0.0.0:9000".into()),
            ENV_MAX_PENDING => Some(" 4096 ".into()),
            _ => None,
        })?;
        assert_eq!(config.addr, SocketAddr::from(([0, 0, 0, 0], 9000)));
        assert_eq!(config.max_pending, 4096);
        assert_eq!(config.read_chunk, DEFAULT_READ_CHUNK);
        Ok(())
    }

    #[test]
    fn bad_override_is_reported() {
        let result = ServerConfig::from_lookup(|key| (key == ENV_READ_CHUNK).then(|| "lots".to_string()));
        assert!(matches!(result, Err(NetError::Config { key: ENV_READ_CHUNK, .. })));
    }
}
