// Election core
pub mod config;
pub mod election;

// Transport and wire format
pub mod network;

// Public exports
pub use config::Config;
pub use election::{
    ElectionConfig, ElectionError, Message, Outgoing, Peer, PeerHandle, PeerId, PeerState, Role,
    Term,
};
pub use network::{MemoryNetwork, MemoryTransport, Transport, TransportError, UdpTransport};
