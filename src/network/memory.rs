use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;
use log::trace;

use super::{codec, Transport, TransportError};
use crate::election::{Message, PeerId};

/// In-process datagram network.
///
/// Messages are encoded exactly as on the wire. Traffic to or from an
/// isolated peer, or to an id nobody has bound, is silently lost.
#[derive(Clone, Default)]
pub struct MemoryNetwork {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    inboxes: HashMap<PeerId, mpsc::UnboundedSender<Vec<u8>>>,
    isolated: HashSet<PeerId>,
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&self, id: PeerId) -> Result<MemoryTransport, TransportError> {
        let mut inner = self.lock();
        if inner.inboxes.contains_key(&id) {
            return Err(TransportError::Bind {
                addr: format!("memory:{id}"),
                source: io::Error::from(io::ErrorKind::AddrInUse),
            });
        }

        let (tx, rx) = mpsc::unbounded_channel();
        inner.inboxes.insert(id, tx);

        Ok(MemoryTransport {
            id,
            network: self.clone(),
            inbox: rx,
        })
    }

    pub fn is_bound(&self, id: PeerId) -> bool {
        self.lock().inboxes.contains_key(&id)
    }

    /// Cuts `id` off from everyone until [`MemoryNetwork::heal`].
    pub fn isolate(&self, id: PeerId) {
        self.lock().isolated.insert(id);
    }

    pub fn heal(&self, id: PeerId) {
        self.lock().isolated.remove(&id);
    }

    /// Delivers raw bytes to `to`, bypassing encoding and isolation.
    pub fn inject(&self, to: PeerId, bytes: Vec<u8>) -> bool {
        match self.lock().inboxes.get(&to) {
            Some(tx) => tx.send(bytes).is_ok(),
            None => false,
        }
    }

    fn deliver(&self, from: PeerId, to: PeerId, bytes: Vec<u8>) -> bool {
        let inner = self.lock();
        if inner.isolated.contains(&from) || inner.isolated.contains(&to) {
            return false;
        }
        match inner.inboxes.get(&to) {
            Some(tx) => tx.send(bytes).is_ok(),
            None => false,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct MemoryTransport {
    id: PeerId,
    network: MemoryNetwork,
    inbox: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl MemoryTransport {
    pub fn id(&self) -> PeerId {
        self.id
    }
}

impl Transport for MemoryTransport {
    async fn send(&mut self, to: PeerId, message: Message) -> Result<(), TransportError> {
        let bytes = codec::encode(message)?;
        if !self.network.deliver(self.id, to, bytes) {
            trace!("Dropped {} from {} to {to}", message.kind(), self.id);
        }
        Ok(())
    }

    async fn recv_timeout(&mut self, wait: Duration) -> Result<Option<Message>, TransportError> {
        match timeout(wait, self.inbox.recv()).await {
            Err(_) => Ok(None),
            Ok(None) => Err(TransportError::Closed),
            Ok(Some(bytes)) => codec::decode(&bytes).map(Some),
        }
    }
}

impl Drop for MemoryTransport {
    fn drop(&mut self) {
        self.network.lock().inboxes.remove(&self.id);
    }
}
