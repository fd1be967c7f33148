//! Hierarchical gossip clustering protocol core.
//!
//! A distributed, gossip-driven variant of Luby-style maximal independent
//! set construction extended to multiple levels: at level 0 every node is
//! its own representative; at each higher level `n`, a subset of level
//! `n - 1` representatives elect themselves as level-`n` representatives
//! and every other level-`n - 1` representative follows one such rep,
//! forming a level-`n` group. Group membership, routes and a per-group
//! median aggregate are disseminated by exchanging serialized level stacks
//! with directly connected graph neighbors.
//!
//! [`NodeState`] is the whole of the per-node state machine: feed it
//! decoded gossip from [`NodeState::on_receive`] and it reconciles
//! topology, runs representative election, trims stale routes, updates
//! per-group values and probabilistically promotes itself, emitting
//! observable [`event::Event`]s along the way.

mod codec;
mod election;
pub mod event;
mod node;
mod topology;
mod types;
mod values;

pub use codec::DecodeError;
pub use node::NodeState;
pub use types::{Level, PeerEntry};
