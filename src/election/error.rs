use thiserror::Error;

use crate::network::TransportError;

#[derive(Error, Debug)]
pub enum ElectionError {
    #[error("Invalid membership: {0}")]
    InvalidMembership(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Peer task failed: {0}")]
    TaskFailed(String),
}
