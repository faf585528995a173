use thiserror::Error;

use crate::election::PeerId;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed message: {0}")]
    Malformed(String),

    #[error("Encoding error: {0}")]
    Encode(String),

    #[error("Unknown peer: {0}")]
    UnknownPeer(PeerId),

    #[error("Endpoint closed")]
    Closed,
}
