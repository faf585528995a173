use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::timeout;
use log::trace;

use super::{codec, Transport, TransportError};
use crate::election::{Message, PeerId};

const MAX_DATAGRAM: usize = 4096;

/// Datagram transport: one bound socket per peer, peers addressed by id.
pub struct UdpTransport {
    id: PeerId,
    socket: UdpSocket,
    peers: BTreeMap<PeerId, SocketAddr>,
    buf: Vec<u8>,
}

impl UdpTransport {
    pub async fn bind(
        id: PeerId,
        local: SocketAddr,
        peers: BTreeMap<PeerId, SocketAddr>,
    ) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(local)
            .await
            .map_err(|source| TransportError::Bind {
                addr: local.to_string(),
                source,
            })?;

        Ok(Self {
            id,
            socket,
            peers,
            buf: vec![0; MAX_DATAGRAM],
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.socket.local_addr()?)
    }
}

impl Transport for UdpTransport {
    async fn send(&mut self, to: PeerId, message: Message) -> Result<(), TransportError> {
        let addr = *self.peers.get(&to).ok_or(TransportError::UnknownPeer(to))?;
        let bytes = codec::encode(message)?;
        self.socket.send_to(&bytes, addr).await?;
        trace!("Peer {} sent {} to {to} at {addr}", self.id, message.kind());
        Ok(())
    }

    async fn recv_timeout(&mut self, wait: Duration) -> Result<Option<Message>, TransportError> {
        match timeout(wait, self.socket.recv_from(&mut self.buf)).await {
            Err(_) => Ok(None),
            Ok(Err(e)) => Err(TransportError::Io(e)),
            Ok(Ok((len, addr))) => {
                trace!("Peer {} received {len} bytes from {addr}", self.id);
                codec::decode(&self.buf[..len]).map(Some)
            }
        }
    }
}
