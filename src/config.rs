use std::collections::{BTreeMap, BTreeSet};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::election::{ElectionConfig, ElectionError, PeerId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub node_id: PeerId,
    pub host: IpAddr,
    /// Peer `n` listens on `base_port + n`.
    pub base_port: u16,
    pub members: Vec<PeerId>,
    pub election: ElectionConfig,
}

impl Config {
    pub fn for_node(node_id: PeerId, members: Vec<PeerId>) -> Self {
        Self {
            node_id,
            members,
            ..Self::default()
        }
    }

    /// Reads a JSON config file. Fields missing from the file keep their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ElectionError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ElectionError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&contents).map_err(|e| {
            ElectionError::InvalidConfig(format!("cannot parse {}: {e}", path.display()))
        })
    }

    pub fn peer_addr(&self, id: PeerId) -> Result<SocketAddr, ElectionError> {
        let port = u16::try_from(id)
            .ok()
            .and_then(|offset| self.base_port.checked_add(offset))
            .ok_or_else(|| {
                ElectionError::InvalidConfig(format!(
                    "peer {id} has no port above base port {}",
                    self.base_port
                ))
            })?;
        Ok(SocketAddr::new(self.host, port))
    }

    pub fn member_addrs(&self) -> Result<BTreeMap<PeerId, SocketAddr>, ElectionError> {
        self.members
            .iter()
            .map(|&id| self.peer_addr(id).map(|addr| (id, addr)))
            .collect()
    }

    pub fn validate(&self) -> Result<(), ElectionError> {
        if self.members.is_empty() {
            return Err(ElectionError::InvalidMembership(
                "membership is empty".to_string(),
            ));
        }
        let distinct: BTreeSet<PeerId> = self.members.iter().copied().collect();
        if distinct.len() != self.members.len() {
            return Err(ElectionError::InvalidMembership(format!(
                "duplicate ids in membership {:?}",
                self.members
            )));
        }
        if !distinct.contains(&self.node_id) {
            return Err(ElectionError::InvalidMembership(format!(
                "node {} is not in membership {:?}",
                self.node_id, self.members
            )));
        }
        self.member_addrs()?;
        self.election.validate()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            node_id: 0,
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            base_port: 5000,
            members: (0..5).collect(),
            election: ElectionConfig::default(),
        }
    }
}
