use std::collections::BTreeSet;
use std::time::Instant;

use log::{debug, info, warn};

use super::timer::random_election_timeout;
use super::{ElectionConfig, ElectionError, Message, Outgoing, PeerId, PeerState, Role, Term};

/// Election state machine for one cluster member.
///
/// `Peer` performs no IO and reads no clock: callers pass the current instant
/// and deliver the returned [`Outgoing`] messages themselves.
#[derive(Debug)]
pub struct Peer {
    // Identity
    id: PeerId,
    members: BTreeSet<PeerId>,

    // Configuration
    config: ElectionConfig,

    // Election state
    current_term: Term,
    role: Role,
    voted_for: Option<PeerId>,
    leader_id: Option<PeerId>,
    // Distinct peers whose grant was counted in the current election.
    votes_received: BTreeSet<PeerId>,

    // Timers
    election_deadline: Instant,
    next_heartbeat: Instant,
}

impl Peer {
    pub fn new<I>(
        id: PeerId,
        members: I,
        config: ElectionConfig,
        now: Instant,
    ) -> Result<Self, ElectionError>
    where
        I: IntoIterator<Item = PeerId>,
    {
        config.validate()?;

        let members: BTreeSet<PeerId> = members.into_iter().collect();
        if members.is_empty() {
            return Err(ElectionError::InvalidMembership(
                "membership is empty".to_string(),
            ));
        }
        if !members.contains(&id) {
            return Err(ElectionError::InvalidMembership(format!(
                "peer {id} is not in membership {members:?}"
            )));
        }

        let election_deadline = now
            + random_election_timeout(config.election_timeout_min, config.election_timeout_max);

        Ok(Self {
            id,
            members,
            config,
            current_term: 0,
            role: Role::Follower,
            voted_for: None,
            leader_id: None,
            votes_received: BTreeSet::new(),
            election_deadline,
            next_heartbeat: now,
        })
    }

    pub fn id(&self) -> PeerId {
        self.id
    }

    pub fn members(&self) -> &BTreeSet<PeerId> {
        &self.members
    }

    pub fn config(&self) -> &ElectionConfig {
        &self.config
    }

    pub fn current_term(&self) -> Term {
        self.current_term
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_leader(&self) -> bool {
        matches!(self.role, Role::Leader)
    }

    pub fn voted_for(&self) -> Option<PeerId> {
        self.voted_for
    }

    pub fn leader_id(&self) -> Option<PeerId> {
        self.leader_id
    }

    pub fn votes_received(&self) -> usize {
        self.votes_received.len()
    }

    pub fn election_deadline(&self) -> Instant {
        self.election_deadline
    }

    /// Smallest number of votes that wins an election.
    pub fn quorum_size(&self) -> usize {
        self.members.len() / 2 + 1
    }

    fn has_quorum(&self) -> bool {
        self.votes_received.len() > self.members.len() / 2
    }

    pub fn state(&self) -> PeerState {
        PeerState {
            id: self.id,
            current_term: self.current_term,
            role: self.role,
            voted_for: self.voted_for,
            leader_id: self.leader_id,
            votes_received: self.votes_received.len(),
        }
    }

    /// The instant at which [`Peer::tick`] next has work to do.
    pub fn next_wakeup(&self) -> Instant {
        match self.role {
            Role::Leader => self.next_heartbeat,
            Role::Follower | Role::Candidate => self.election_deadline,
        }
    }

    /// Fires whichever timer is due: the election timeout for followers and
    /// candidates, the heartbeat period for leaders.
    pub fn tick(&mut self, now: Instant) -> Vec<Outgoing> {
        match self.role {
            Role::Leader => {
                if now >= self.next_heartbeat {
                    self.broadcast_heartbeat(now)
                } else {
                    Vec::new()
                }
            }
            Role::Follower | Role::Candidate => {
                if now >= self.election_deadline {
                    info!(
                        "Peer {} election timeout elapsed in term {} as {}",
                        self.id, self.current_term, self.role
                    );
                    self.become_candidate(now)
                } else {
                    Vec::new()
                }
            }
        }
    }

    pub fn handle(&mut self, message: Message, now: Instant) -> Vec<Outgoing> {
        let sender = message.sender();
        if sender == self.id {
            warn!("Peer {} discarding {} from itself", self.id, message.kind());
            return Vec::new();
        }
        if !self.members.contains(&sender) {
            warn!(
                "Peer {} discarding {} from non-member {sender}",
                self.id,
                message.kind()
            );
            return Vec::new();
        }

        // A higher term always wins, whatever the message says.
        if message.term() > self.current_term {
            info!(
                "Peer {} saw term {} from peer {sender} (current {}), stepping down",
                self.id,
                message.term(),
                self.current_term
            );
            self.become_follower(message.term(), None, now);
        }

        match message {
            Message::VoteRequest { term, from } => self.handle_vote_request(term, from),
            Message::VoteResponse {
                term,
                from,
                granted,
            } => self.handle_vote_response(term, from, granted, now),
            Message::Heartbeat { term, from } => {
                self.handle_heartbeat(term, from, now);
                Vec::new()
            }
        }
    }

    fn handle_vote_request(&mut self, term: Term, candidate: PeerId) -> Vec<Outgoing> {
        let granted = term >= self.current_term
            && (self.voted_for.is_none() || self.voted_for == Some(candidate));

        if granted {
            self.voted_for = Some(candidate);
            info!(
                "Peer {} granted vote to {candidate} for term {}",
                self.id, self.current_term
            );
        } else {
            debug!(
                "Peer {} denied vote to {candidate} (request term {term}, current {}, voted for {:?})",
                self.id, self.current_term, self.voted_for
            );
        }

        vec![Outgoing {
            to: candidate,
            message: Message::VoteResponse {
                term: self.current_term,
                from: self.id,
                granted,
            },
        }]
    }

    fn handle_vote_response(
        &mut self,
        term: Term,
        voter: PeerId,
        granted: bool,
        now: Instant,
    ) -> Vec<Outgoing> {
        if self.role != Role::Candidate || term != self.current_term {
            debug!(
                "Peer {} ignoring vote response from {voter} (term {term}, current {}, {})",
                self.id, self.current_term, self.role
            );
            return Vec::new();
        }
        if !granted {
            return Vec::new();
        }
        if !self.votes_received.insert(voter) {
            debug!(
                "Peer {} already counted vote from {voter} in term {}",
                self.id, self.current_term
            );
            return Vec::new();
        }

        debug!(
            "Peer {} has {}/{} votes in term {}",
            self.id,
            self.votes_received.len(),
            self.members.len(),
            self.current_term
        );

        if self.has_quorum() {
            self.become_leader(now)
        } else {
            Vec::new()
        }
    }

    fn handle_heartbeat(&mut self, term: Term, leader: PeerId, now: Instant) {
        if term < self.current_term {
            debug!(
                "Peer {} ignoring stale heartbeat from {leader} (term {term}, current {})",
                self.id, self.current_term
            );
            return;
        }

        if self.role != Role::Follower {
            self.become_follower(term, Some(leader), now);
        } else {
            self.leader_id = Some(leader);
            self.reset_election_deadline(now);
        }
    }

    fn reset_election_deadline(&mut self, now: Instant) {
        self.election_deadline = now
            + random_election_timeout(
                self.config.election_timeout_min,
                self.config.election_timeout_max,
            );
    }

    fn become_follower(&mut self, term: Term, leader: Option<PeerId>, now: Instant) {
        // The vote only resets with a new term; a same-term step-down keeps it.
        if term > self.current_term {
            self.current_term = term;
            self.voted_for = None;
        }
        self.role = Role::Follower;
        self.leader_id = leader;
        self.votes_received.clear();
        self.reset_election_deadline(now);

        info!(
            "Peer {} became follower for term {} (leader {:?})",
            self.id, self.current_term, self.leader_id
        );
    }

    fn become_candidate(&mut self, now: Instant) -> Vec<Outgoing> {
        let Some(next_term) = self.current_term.checked_add(1) else {
            warn!(
                "Peer {} cannot start an election: term {} is exhausted",
                self.id, self.current_term
            );
            self.become_follower(self.current_term, None, now);
            return Vec::new();
        };

        self.current_term = next_term;
        self.role = Role::Candidate;
        self.voted_for = Some(self.id);
        self.leader_id = None;
        self.votes_received.clear();
        self.votes_received.insert(self.id);
        self.reset_election_deadline(now);

        info!(
            "Peer {} became candidate for term {}",
            self.id, self.current_term
        );

        // A single-member cluster wins on its own vote.
        if self.has_quorum() {
            return self.become_leader(now);
        }

        self.broadcast(Message::VoteRequest {
            term: self.current_term,
            from: self.id,
        })
    }

    fn become_leader(&mut self, now: Instant) -> Vec<Outgoing> {
        info!(
            "Peer {} becoming leader for term {} with {} votes",
            self.id,
            self.current_term,
            self.votes_received.len()
        );

        self.role = Role::Leader;
        self.leader_id = Some(self.id);
        self.votes_received.clear();

        self.broadcast_heartbeat(now)
    }

    fn broadcast_heartbeat(&mut self, now: Instant) -> Vec<Outgoing> {
        self.next_heartbeat = now + self.config.heartbeat_period();
        debug!(
            "Peer {} sending heartbeat for term {}",
            self.id, self.current_term
        );
        self.broadcast(Message::Heartbeat {
            term: self.current_term,
            from: self.id,
        })
    }

    fn broadcast(&self, message: Message) -> Vec<Outgoing> {
        self.members
            .iter()
            .filter(|&&member| member != self.id)
            .map(|&to| Outgoing { to, message })
            .collect()
    }
}
