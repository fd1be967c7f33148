//! Node-local configuration: identity, bind address and neighbor table.

use std::collections::HashMap;
use std::net::SocketAddr;

/// Everything a running node needs beyond the protocol core itself.
///
/// Kept out of `stratum_core::NodeState` deliberately: the core stays free
/// of I/O concerns, the same way `citadel-dht`'s `PeerKnowledge` keeps
/// `SocketAddr`s in `PeerInfo` rather than in the core DHT entry types.
#[derive(Debug, Clone)]
pub struct Config {
    pub my_id: u32,
    pub my_value: f64,
    pub bind: SocketAddr,
    pub neighbors: HashMap<u32, SocketAddr>,
    pub json_events: bool,
}
