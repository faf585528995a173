mod codec;
mod error;
mod memory;
pub mod metrics;
mod udp;

pub use self::codec::{decode, encode};
pub use self::error::TransportError;
pub use self::memory::{MemoryNetwork, MemoryTransport};
pub use self::udp::UdpTransport;

use std::future::Future;
use std::time::Duration;

use crate::election::{Message, PeerId};

/// Best-effort datagram delivery between peers.
///
/// Loss is never an error: `send` fails only when the message could not even
/// be handed to the network, and a quiet network is `Ok(None)` from
/// `recv_timeout`.
pub trait Transport: Send {
    fn send(
        &mut self,
        to: PeerId,
        message: Message,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Waits at most `wait` for the next inbound message.
    fn recv_timeout(
        &mut self,
        wait: Duration,
    ) -> impl Future<Output = Result<Option<Message>, TransportError>> + Send;
}
