#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::{Duration, Instant};

use herald::{ElectionConfig, Message, Outgoing, Peer, PeerId, Term};

pub fn sim_config() -> ElectionConfig {
    ElectionConfig::new(150, 300, 50)
}

/// Drives a set of peers by hand: a virtual clock, a pool of messages in
/// flight, and a record of every leader seen at every term.
pub struct Cluster {
    pub peers: BTreeMap<PeerId, Peer>,
    pub now: Instant,
    pub in_flight: Vec<Outgoing>,
    pub isolated: BTreeSet<PeerId>,
    pub leaders: HashMap<Term, BTreeSet<PeerId>>,
}

impl Cluster {
    pub fn new(size: u64) -> Self {
        let now = Instant::now();
        let members: Vec<PeerId> = (0..size).collect();
        let peers = members
            .iter()
            .map(|&id| {
                let peer = Peer::new(id, members.iter().copied(), sim_config(), now)
                    .expect("valid peer");
                (id, peer)
            })
            .collect();

        Self {
            peers,
            now,
            in_flight: Vec::new(),
            isolated: BTreeSet::new(),
            leaders: HashMap::new(),
        }
    }

    pub fn peer(&self, id: PeerId) -> &Peer {
        &self.peers[&id]
    }

    pub fn advance(&mut self, by: Duration) {
        self.now += by;
    }

    /// Ticks one peer at the current instant and queues what it sends.
    pub fn tick(&mut self, id: PeerId) {
        let now = self.now;
        if let Some(peer) = self.peers.get_mut(&id) {
            let outgoing = peer.tick(now);
            self.in_flight.extend(outgoing);
        }
        self.record_leaders();
    }

    pub fn tick_all(&mut self) {
        let ids: Vec<PeerId> = self.peers.keys().copied().collect();
        for id in ids {
            self.tick(id);
        }
    }

    /// Hands one in-flight message to its recipient, unless either end is
    /// isolated. Replies join the pool.
    pub fn deliver(&mut self, index: usize) {
        if self.in_flight.is_empty() {
            return;
        }
        let Outgoing { to, message } = self.in_flight.remove(index % self.in_flight.len());
        self.receive(to, message);
    }

    /// Delivers a copy of an in-flight message, leaving the original queued.
    pub fn duplicate(&mut self, index: usize) {
        if self.in_flight.is_empty() {
            return;
        }
        let Outgoing { to, message } = self.in_flight[index % self.in_flight.len()];
        self.receive(to, message);
    }

    pub fn lose(&mut self, index: usize) {
        if !self.in_flight.is_empty() {
            let len = self.in_flight.len();
            self.in_flight.remove(index % len);
        }
    }

    pub fn deliver_all(&mut self) {
        while !self.in_flight.is_empty() {
            self.deliver(0);
        }
    }

    /// Jumps the clock to the earliest pending timer, fires it and lets the
    /// resulting traffic settle.
    pub fn run_next_timer(&mut self) {
        let next = self
            .peers
            .values()
            .map(Peer::next_wakeup)
            .min()
            .expect("cluster has peers");
        if next > self.now {
            self.now = next;
        }
        self.tick_all();
        self.deliver_all();
    }

    /// The peer every non-isolated member follows, if they all agree.
    pub fn settled_leader(&self) -> Option<PeerId> {
        let connected: Vec<&Peer> = self
            .peers
            .values()
            .filter(|p| !self.isolated.contains(&p.id()))
            .collect();
        let leader = connected.iter().find(|p| p.is_leader())?;
        connected
            .iter()
            .all(|p| {
                p.current_term() == leader.current_term() && p.leader_id() == Some(leader.id())
            })
            .then(|| leader.id())
    }

    pub fn run_until_settled(&mut self, max_timers: usize) -> PeerId {
        for _ in 0..max_timers {
            if let Some(leader) = self.settled_leader() {
                return leader;
            }
            self.run_next_timer();
        }
        panic!("no settled leader after {max_timers} timers");
    }

    pub fn assert_one_leader_per_term(&self) {
        for (term, leaders) in &self.leaders {
            assert!(
                leaders.len() <= 1,
                "term {term} had several leaders: {leaders:?}"
            );
        }
    }

    fn receive(&mut self, to: PeerId, message: Message) {
        if self.isolated.contains(&to) || self.isolated.contains(&message.sender()) {
            return;
        }
        let now = self.now;
        if let Some(peer) = self.peers.get_mut(&to) {
            let outgoing = peer.handle(message, now);
            self.in_flight.extend(outgoing);
        }
        self.record_leaders();
    }

    fn record_leaders(&mut self) {
        for peer in self.peers.values() {
            if peer.is_leader() {
                self.leaders
                    .entry(peer.current_term())
                    .or_default()
                    .insert(peer.id());
            }
        }
    }
}
