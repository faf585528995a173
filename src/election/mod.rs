mod config;
mod error;
mod node;
mod state;
pub mod timer;

pub use self::config::ElectionConfig;
pub use self::error::ElectionError;
pub use self::node::Peer;
pub use self::state::{PeerState, Role};

use std::time::Instant;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use log::{debug, error, info, warn};

use crate::config::Config;
use crate::network::{metrics, Transport, TransportError, UdpTransport};

pub type PeerId = u64;
pub type Term = u64;

// Message types exchanged between peers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    VoteRequest {
        term: Term,
        from: PeerId,
    },
    VoteResponse {
        term: Term,
        from: PeerId,
        granted: bool,
    },
    Heartbeat {
        term: Term,
        from: PeerId,
    },
}

impl Message {
    pub fn term(&self) -> Term {
        match self {
            Message::VoteRequest { term, .. }
            | Message::VoteResponse { term, .. }
            | Message::Heartbeat { term, .. } => *term,
        }
    }

    pub fn sender(&self) -> PeerId {
        match self {
            Message::VoteRequest { from, .. }
            | Message::VoteResponse { from, .. }
            | Message::Heartbeat { from, .. } => *from,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Message::VoteRequest { .. } => "VoteRequest",
            Message::VoteResponse { .. } => "VoteResponse",
            Message::Heartbeat { .. } => "Heartbeat",
        }
    }
}

/// A message the peer wants delivered to `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outgoing {
    pub to: PeerId,
    pub message: Message,
}

/// Owner-side handle to a peer running on its own tokio task.
///
/// Dropping the handle without calling [`PeerHandle::stop`] also stops the
/// peer, but nobody waits for it to finish.
pub struct PeerHandle {
    id: PeerId,
    state: watch::Receiver<PeerState>,
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PeerHandle {
    /// Binds this node's UDP endpoint and starts its election loop.
    ///
    /// Fails if the configuration is invalid or the endpoint cannot be bound.
    pub async fn bind_udp(config: &Config) -> Result<Self, ElectionError> {
        config.validate()?;

        let local = config.peer_addr(config.node_id)?;
        let mut peers = config.member_addrs()?;
        peers.remove(&config.node_id);

        let transport = UdpTransport::bind(config.node_id, local, peers).await?;
        let peer = Peer::new(
            config.node_id,
            config.members.iter().copied(),
            config.election.clone(),
            Instant::now(),
        )?;

        Ok(Self::spawn(peer, transport))
    }

    pub fn spawn<T>(peer: Peer, transport: T) -> Self
    where
        T: Transport + 'static,
    {
        let id = peer.id();
        let (state_tx, state_rx) = watch::channel(peer.state());
        let (stop_tx, stop_rx) = watch::channel(false);

        let task = tokio::spawn(run_peer(peer, transport, stop_rx, state_tx));

        Self {
            id,
            state: state_rx,
            stop: stop_tx,
            task,
        }
    }

    pub fn id(&self) -> PeerId {
        self.id
    }

    pub fn state(&self) -> PeerState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PeerState> {
        self.state.clone()
    }

    /// Requests a graceful shutdown and waits for the loop to exit.
    /// Returns the last published state.
    pub async fn stop(self) -> Result<PeerState, ElectionError> {
        // The loop may already be gone; joining below still reports how it ended.
        let _ = self.stop.send(true);
        self.task
            .await
            .map_err(|e| ElectionError::TaskFailed(e.to_string()))?;
        let state = self.state.borrow().clone();
        Ok(state)
    }
}

enum Wake {
    Stop,
    Inbound(Result<Option<Message>, TransportError>),
}

async fn run_peer<T: Transport>(
    mut peer: Peer,
    mut transport: T,
    mut stop: watch::Receiver<bool>,
    state: watch::Sender<PeerState>,
) {
    info!(
        "Peer {} started with members {:?}",
        peer.id(),
        peer.members()
    );

    loop {
        if *stop.borrow() {
            break;
        }

        let outgoing = peer.tick(Instant::now());
        dispatch(&mut transport, peer.id(), outgoing).await;
        publish(&state, &peer);

        let wait = peer
            .next_wakeup()
            .saturating_duration_since(Instant::now())
            .min(peer.config().receive_wait());

        let wake = tokio::select! {
            changed = stop.changed() => match changed {
                Ok(()) => continue,
                // The handle is gone, so nobody can ask us to stop any more.
                Err(_) => Wake::Stop,
            },
            received = transport.recv_timeout(wait) => Wake::Inbound(received),
        };

        match wake {
            Wake::Stop => break,
            Wake::Inbound(Ok(Some(message))) => {
                metrics::record_received();
                let outgoing = peer.handle(message, Instant::now());
                dispatch(&mut transport, peer.id(), outgoing).await;
                publish(&state, &peer);
            }
            Wake::Inbound(Ok(None)) => {}
            Wake::Inbound(Err(TransportError::Malformed(reason))) => {
                metrics::record_malformed();
                warn!("Peer {} discarded malformed message: {reason}", peer.id());
            }
            Wake::Inbound(Err(TransportError::Closed)) => {
                error!("Peer {} transport closed, stopping", peer.id());
                break;
            }
            Wake::Inbound(Err(e)) => {
                warn!("Peer {} receive failed: {e}", peer.id());
            }
        }
    }

    publish(&state, &peer);
    info!(
        "Peer {} stopped at term {} as {}",
        peer.id(),
        peer.current_term(),
        peer.role()
    );
}

async fn dispatch<T: Transport>(transport: &mut T, id: PeerId, outgoing: Vec<Outgoing>) {
    for Outgoing { to, message } in outgoing {
        match transport.send(to, message).await {
            Ok(()) => metrics::record_sent(),
            Err(e) => {
                metrics::record_send_failure();
                debug!("Peer {id} failed to send {} to peer {to}: {e}", message.kind());
            }
        }
    }
}

fn publish(state: &watch::Sender<PeerState>, peer: &Peer) {
    let current = peer.state();
    state.send_if_modified(|published| {
        if *published == current {
            false
        } else {
            *published = current;
            true
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_accessors() {
        let request = Message::VoteRequest { term: 3, from: 1 };
        let response = Message::VoteResponse {
            term: 4,
            from: 2,
            granted: true,
        };
        let heartbeat = Message::Heartbeat { term: 5, from: 0 };

        assert_eq!((request.term(), request.sender()), (3, 1));
        assert_eq!((response.term(), response.sender()), (4, 2));
        assert_eq!((heartbeat.term(), heartbeat.sender()), (5, 0));
        assert_eq!(request.kind(), "VoteRequest");
        assert_eq!(response.kind(), "VoteResponse");
        assert_eq!(heartbeat.kind(), "Heartbeat");
    }
}
