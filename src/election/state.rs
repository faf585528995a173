use std::fmt;

use serde::{Deserialize, Serialize};

use super::{PeerId, Term};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Follower,
    Candidate,
    Leader,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Follower => write!(f, "follower"),
            Role::Candidate => write!(f, "candidate"),
            Role::Leader => write!(f, "leader"),
        }
    }
}

/// Point-in-time view of a peer, published by the running event loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerState {
    pub id: PeerId,
    pub current_term: Term,
    pub role: Role,
    pub voted_for: Option<PeerId>,
    pub leader_id: Option<PeerId>,
    /// Distinct voters counted in the current election; zero outside candidacy.
    pub votes_received: usize,
}

impl PeerState {
    pub fn is_leader(&self) -> bool {
        self.role == Role::Leader
    }
}
