//! Node state, lifecycle and the per-message dispatcher (§4.3, §4.4).

use rand::Rng;

use crate::codec;
use crate::event::{Event, Sink};
use crate::types::Level;

/// Per-node protocol state: one `Level` per tier of the hierarchy the node
/// currently participates in, plus the bookkeeping needed to emit
/// observable events.
pub struct NodeState {
    pub my_id: u32,
    pub my_value: f64,
    pub(crate) levels: Vec<Level>,
    pub(crate) tick: u64,
    pub(crate) sink: Box<dyn Sink>,
}

impl NodeState {
    /// A fresh node, always a representative of its own level 0 (invariant 1).
    pub fn new(my_id: u32, my_value: f64, sink: Box<dyn Sink>) -> Self {
        let mut level0 = Level::new(0);
        level0.rep = my_id;
        level0.rep_next_hop = my_id;
        level0.rep_dist = 0;
        level0.rep_value = my_value;
        Self {
            my_id,
            my_value,
            levels: vec![level0],
            tick: 0,
            sink,
        }
    }

    /// Levels this node currently tracks, lowest first.
    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    /// Highest level index this node currently tracks.
    pub fn max_level(&self) -> u32 {
        self.levels.len() as u32 - 1
    }

    pub(crate) fn emit(&mut self, event: Event) {
        let tick = self.tick;
        self.sink.observe(self.my_id, tick, event);
    }

    /// Serializes this node's current levels for gossip.
    pub fn encode(&self) -> Vec<u8> {
        codec::encode(self.my_id, &self.levels)
    }

    /// Records a gossip transmission to `to` through the sink (§6).
    pub fn record_send(&mut self, to: u32, bytes: usize) {
        self.emit(Event::Send { to, bytes });
    }

    /// Exact length `encode` will produce for the current state.
    pub fn encoded_size(&self) -> usize {
        codec::encoded_size(&self.levels)
    }

    /// Truncates the level vector so its highest index is `level` (§4.3).
    ///
    /// A no-op if the node is already at or below `level`. Dropped levels
    /// take their peer maps and rep state with them.
    pub fn set_max_level(&mut self, level: u32) {
        if self.max_level() <= level {
            return;
        }
        self.levels.truncate(level as usize + 1);
        self.emit(Event::MaxLevel { level });
    }

    /// Appends a fresh, unelected level once the current top level has a
    /// non-zero representative and a non-empty peer map (§4.6).
    pub fn try_to_start_new_level(&mut self) {
        let top = self.levels.len() - 1;
        if self.levels[top].rep != 0 && !self.levels[top].peers.is_empty() {
            self.levels.push(Level::new(top as u32 + 1));
        }
    }

    /// Processes one inbound gossip message from `sender`, dispatching
    /// through the full reconciliation pipeline (§4.4).
    pub fn on_receive(&mut self, wire: &[u8], rng: &mut impl Rng) -> Result<(), codec::DecodeError> {
        self.tick += 1;
        let (sender, msg_levels) = codec::decode(wire)?;
        self.emit(Event::Recv {
            from: sender,
            bytes: wire.len(),
        });

        let mut n = 0usize;
        while n < msg_levels.len() && n < self.levels.len() {
            self.process_topology_changes(sender, &msg_levels, n);
            self.try_to_start_new_level();
            if n < msg_levels.len() && n < self.levels.len() {
                self.handle_rep_election(sender, &msg_levels, n);
            }
            n += 1;
        }

        self.trim_vacated_leaders_and_peers(sender, &msg_levels);
        self.update_peer_values(sender, &msg_levels);
        self.recalculate_level_values();
        self.try_to_become_rep(rng);

        self.debug_check_invariants();

        Ok(())
    }

    /// Checks the structural invariants that must hold after any update.
    /// A violation here is a programmer error, not a recoverable condition.
    #[cfg(debug_assertions)]
    fn debug_check_invariants(&self) {
        let level0 = &self.levels[0];
        debug_assert_eq!(level0.rep, self.my_id, "invariant 1: level 0 rep is always self");
        debug_assert_eq!(level0.rep_next_hop, self.my_id, "invariant 1: level 0 rep_next_hop is self");
        debug_assert_eq!(level0.rep_dist, 0, "invariant 1: level 0 rep_dist is 0");

        for (n, level) in self.levels.iter().enumerate() {
            debug_assert!(
                !level.peers.contains_key(&self.my_id),
                "invariant 4: level {n} peers must never contain my own id"
            );
            let max_dist = level.max_peer_distance();
            for (&key, peer) in &level.peers {
                debug_assert!(
                    peer.dist >= 1 && peer.dist <= max_dist,
                    "invariant 6: level {n} peer {key} dist {} out of [1,{max_dist}]",
                    peer.dist
                );
            }
            if n >= 1 {
                if level.rep != 0 {
                    let lower = &self.levels[n - 1];
                    debug_assert!(
                        level.rep == lower.rep || lower.peers.contains_key(&level.rep),
                        "invariant 2: level {n} rep must be our level {} rep or one of its peers",
                        n - 1
                    );
                } else {
                    debug_assert!(level.peers.is_empty(), "invariant 3: level {n} has no rep but has peers");
                }
            }
        }

        for n in 1..self.levels.len() {
            let lower = &self.levels[n - 1];
            debug_assert!(
                lower.rep != 0 && !lower.peers.is_empty(),
                "invariant 5: level {n} exists but level {} lacks a rep or peers",
                n - 1
            );
        }
    }

    #[cfg(not(debug_assertions))]
    fn debug_check_invariants(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone)]
    struct RecordingSink(Arc<Mutex<Vec<Event>>>);

    impl crate::event::Sink for RecordingSink {
        fn observe(&mut self, _node: u32, _tick: u64, event: Event) {
            self.0.lock().unwrap().push(event);
        }
    }

    #[test]
    fn record_send_emits_a_send_event() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut node = NodeState::new(1, 1.0, Box::new(RecordingSink(events.clone())));
        node.record_send(2, 128);
        assert_eq!(events.lock().unwrap().as_slice(), &[Event::Send { to: 2, bytes: 128 }]);
    }
}
