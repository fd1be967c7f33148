//! `ProcessTopologyChanges` (§4.5): reconcile one level against one
//! neighbor's advertised state.

use crate::node::NodeState;
use crate::types::{Level, PeerEntry};

impl NodeState {
    pub(crate) fn process_topology_changes(&mut self, sender: u32, msg_levels: &[Level], n: usize) {
        if n == 0 {
            self.process_level_zero(sender, &msg_levels[0]);
            return;
        }

        if self.levels[n].rep != 0 {
            let msg_level = &msg_levels[n];
            if msg_level.rep == 0 {
                let to_remove: Vec<u32> = self.levels[n]
                    .peers
                    .iter()
                    .filter(|(_, peer)| peer.next_hop == sender)
                    .map(|(&key, _)| key)
                    .collect();
                if !to_remove.is_empty() {
                    for key in to_remove {
                        self.levels[n].peers.remove(&key);
                    }
                    self.set_max_level(n as u32);
                }
            } else if self.levels[n].rep == msg_level.rep {
                self.reconcile_same_group(sender, msg_levels, n);
            } else {
                self.reconcile_different_group(sender, msg_levels, n);
            }
        } else {
            debug_assert!(self.levels[n].peers.is_empty());
        }

        // Post-conditions (§4.5): an empty peer map at a level below the
        // current max is stale, and losing our own base group strands our
        // representative status at this level.
        if self.levels.len() > n + 1 && self.levels[n].peers.is_empty() {
            self.set_max_level(n as u32);
        }
        if n >= 1 && n < self.levels.len() && self.levels[n].rep == self.my_id && self.levels[n - 1].peers.is_empty() {
            self.set_max_level(n as u32 - 1);
        }
    }

    fn process_level_zero(&mut self, sender: u32, msg_level0: &Level) {
        if sender == self.my_id {
            return;
        }
        let msg_degree = msg_level0.peers.len() as u32;
        let level0 = &mut self.levels[0];
        match level0.peers.get(&sender) {
            None => {
                level0.peers.insert(sender, PeerEntry::new(msg_degree, sender, 1));
                self.set_max_level(0);
            }
            Some(existing) if existing.degree != msg_degree => {
                level0.peers.get_mut(&sender).unwrap().degree = msg_degree;
                self.set_max_level(0);
            }
            _ => {}
        }
    }

    fn reconcile_same_group(&mut self, sender: u32, msg_levels: &[Level], n: usize) {
        let max_dist = self.levels[n].max_peer_distance();
        let msg_level = &msg_levels[n];

        let mut to_remove = Vec::new();
        let mut degree_updates = Vec::new();
        let mut dist_updates = Vec::new();

        for (&key, entry) in &self.levels[n].peers {
            if key == sender {
                to_remove.push(key);
                continue;
            }
            if entry.next_hop != sender {
                continue;
            }
            match msg_level.peers.get(&key) {
                None => to_remove.push(key),
                Some(msg_entry) => {
                    if entry.next_hop == self.my_id
                        || entry.dist == 1
                        || msg_entry.dist + 1 > max_dist
                    {
                        to_remove.push(key);
                    } else {
                        if msg_entry.degree != entry.degree {
                            degree_updates.push((key, msg_entry.degree));
                        }
                        dist_updates.push((key, msg_entry.dist + 1));
                    }
                }
            }
        }

        let any_removed = !to_remove.is_empty();
        for key in to_remove {
            self.levels[n].peers.remove(&key);
        }
        let any_degree_changed = !degree_updates.is_empty();
        for (key, degree) in degree_updates {
            if let Some(peer) = self.levels[n].peers.get_mut(&key) {
                peer.degree = degree;
            }
        }
        for (key, dist) in dist_updates {
            if let Some(peer) = self.levels[n].peers.get_mut(&key) {
                peer.dist = dist;
            }
        }
        if any_removed || any_degree_changed {
            self.set_max_level(n as u32);
        }

        // Route shortening: adopt a strictly shorter path to any known peer.
        let mut shorter = Vec::new();
        for (&key, entry) in &self.levels[n].peers {
            if let Some(msg_entry) = msg_level.peers.get(&key) {
                if msg_entry.next_hop != self.my_id && msg_entry.dist + 1 < entry.dist {
                    shorter.push((key, msg_entry.degree, msg_entry.dist + 1));
                }
            }
        }
        for (key, degree, dist) in shorter {
            let peer = self.levels[n].peers.get_mut(&key).unwrap();
            peer.next_hop = sender;
            peer.degree = degree;
            peer.dist = dist;
        }

        // Learn peers the sender advertises that we don't yet know, subject
        // to split-horizon and the hop bound.
        let mut to_add = Vec::new();
        for (&key, msg_entry) in &msg_level.peers {
            if key == self.my_id || key == sender {
                continue;
            }
            if self.levels[n].peers.contains_key(&key) {
                continue;
            }
            if msg_entry.next_hop == self.my_id {
                continue;
            }
            if msg_entry.dist + 1 > max_dist {
                continue;
            }
            to_add.push((
                key,
                PeerEntry {
                    degree: msg_entry.degree,
                    value: msg_entry.value,
                    next_hop: sender,
                    dist: msg_entry.dist + 1,
                },
            ));
        }
        if !to_add.is_empty() {
            for (key, entry) in to_add {
                self.levels[n].peers.insert(key, entry);
            }
            self.set_max_level(n as u32);
        }
    }

    /// Sender belongs to one of our level-n peer groups: reconcile that
    /// group's entry (keyed `r = msg.levels[n].rep`) against its reported
    /// size `d = |msg.levels[n].peers|`.
    fn reconcile_different_group(&mut self, sender: u32, msg_levels: &[Level], n: usize) {
        let msg_level = &msg_levels[n];
        let r = msg_level.rep;
        let d = msg_level.peers.len() as u32;

        let mut to_remove = Vec::new();
        let mut degree_update = None;
        for (&key, entry) in &self.levels[n].peers {
            if (key == r && entry.dist > 1)
                || (entry.next_hop == sender && (key != r || d == 0))
            {
                to_remove.push(key);
            } else if entry.next_hop == sender && entry.degree != d {
                degree_update = Some((key, d));
            }
        }

        let any_removed = !to_remove.is_empty();
        for key in to_remove {
            self.levels[n].peers.remove(&key);
        }
        let any_degree_changed = degree_update.is_some();
        if let Some((key, degree)) = degree_update {
            if let Some(peer) = self.levels[n].peers.get_mut(&key) {
                peer.degree = degree;
            }
        }

        let mut inserted = false;
        if r != 0 && r != self.my_id && !self.levels[n].peers.contains_key(&r) {
            self.levels[n].peers.insert(r, PeerEntry::new(d, sender, 1));
            inserted = true;
        }
        if let Some(peer) = self.levels[n].peers.get_mut(&r) {
            peer.dist = 1;
        }

        if any_removed || any_degree_changed || inserted {
            self.set_max_level(n as u32);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::NullSink;

    fn node(id: u32) -> NodeState {
        NodeState::new(id, id as f64, Box::new(NullSink))
    }

    #[test]
    fn level_zero_learns_new_neighbor() {
        let mut a = node(1);
        let mut msg0 = Level::new(0);
        msg0.rep = 2;
        msg0.peers.insert(9, PeerEntry::new(0, 9, 1));
        a.process_topology_changes(2, &[msg0], 0);
        let peer = a.levels[0].peers.get(&2).expect("neighbor learned");
        assert_eq!(peer.degree, 1);
        assert_eq!(peer.next_hop, 2);
        assert_eq!(peer.dist, 1);
    }

    #[test]
    fn level_zero_updates_changed_degree() {
        let mut a = node(1);
        a.levels[0].peers.insert(2, PeerEntry::new(1, 2, 1));
        let mut msg0 = Level::new(0);
        msg0.rep = 2;
        msg0.peers.insert(9, PeerEntry::new(0, 9, 1));
        msg0.peers.insert(10, PeerEntry::new(0, 10, 1));
        a.process_topology_changes(2, &[msg0], 0);
        assert_eq!(a.levels[0].peers.get(&2).unwrap().degree, 2);
    }

    #[test]
    fn same_group_split_horizon_rejects_route_through_self() {
        let mut a = node(1);
        a.levels.push(Level::new(1));
        a.levels[1].rep = 5;
        let mut msg1 = Level::new(1);
        msg1.rep = 5;
        msg1.peers.insert(1, PeerEntry::new(1, 1, 1));
        a.process_topology_changes(3, &[Level::new(0), msg1], 1);
        assert!(!a.levels[1].peers.contains_key(&1));
    }
}
