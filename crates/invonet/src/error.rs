use std::fmt;

/// Failures of the listener and its connections.
#[derive(Debug)]
pub enum NetError {
    Io(std::io::Error),
    /// The peer sent bytes the codec rejected. The connection cannot resynchronise.
    Codec(invopack::Error),
    /// More undecoded bytes piled up than the configured ceiling allows.
    BufferLimit { pending: usize, limit: usize },
    /// An environment override could not be parsed.
    Config { key: &'static str, value: String },
    UnknownPeer(u64),
    /// The other side of an internal channel is gone.
    Closed,
}

impl fmt::Display for NetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::Codec(e) => write!(f, "codec error: {}", e),
            Self::BufferLimit { pending, limit } => {
                write!(f, "{} undecoded bytes exceed the limit of {}", pending, limit)
            }
            Self::Config { key, value } => write!(f, "invalid value {:?} for {}", value, key),
            Self::UnknownPeer(id) => write!(f, "no connected peer with id {}", id),
            Self::Closed => write!(f, "channel closed"),
        }
    }
}

impl std::error::Error for NetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Codec(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for NetError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<invopack::Error> for NetError {
    fn from(e: invopack::Error) -> Self {
        Self::Codec(e)
    }
}

pub type Result<T> = std::result::Result<T, NetError>;
