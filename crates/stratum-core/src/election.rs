//! `HandleRepElection` (§4.7), `TrimVacatedLeadersAndPeers` (§4.8) and
//! `TryToBecomeRep` (§4.9).

use rand::Rng;

use crate::event::Event;
use crate::node::NodeState;
use crate::types::Level;

impl NodeState {
    fn deselect_rep(&mut self, n: usize) {
        self.levels[n].reset_rep();
        self.set_max_level(n as u32);
        self.levels[n].reset_peers();
        self.emit(Event::Unelect { level: n as u32 });
    }

    pub(crate) fn handle_rep_election(&mut self, sender: u32, msg_levels: &[Level], n: usize) {
        if n == 0 {
            // Level 0 has no elected rep: every node is always its own.
            return;
        }
        let msg_level = &msg_levels[n];

        // Phase A — invalidation.
        let invariant_2_violated = self.levels[n].rep != 0
            && self.levels[n].rep != self.levels[n - 1].rep
            && !self.levels[n - 1].peers.contains_key(&self.levels[n].rep);
        let next_hop_mismatch =
            self.levels[n].rep_next_hop == sender && self.levels[n].rep != msg_level.rep;
        if invariant_2_violated || next_hop_mismatch {
            self.deselect_rep(n);
        }

        if self.levels[n].rep == sender && msg_level.rep != sender {
            self.deselect_rep(n);
        }

        if msg_level.rep == 0 {
            if self.levels[n].rep_next_hop == sender {
                self.deselect_rep(n);
            }
            return;
        }

        // Phase B — election.
        let r = msg_level.rep;
        let eligible = r == self.levels[n - 1].rep || self.levels[n - 1].peers.contains_key(&r);
        if eligible && r != self.levels[n].rep && self.should_adopt(sender, msg_levels, n, r) {
            self.levels[n].rep = r;
            self.levels[n].rep_next_hop = sender;
            self.levels[n].rep_dist = msg_level.rep_dist + 1;
            self.set_max_level(n as u32);
            self.levels[n].reset_peers();
            self.emit(Event::Elect { level: n as u32 });
            return;
        }

        // Phase C — route-shortening.
        if self.levels[n].rep != 0
            && self.levels[n].rep == msg_level.rep
            && msg_level.rep_dist + 1 < self.levels[n].rep_dist
        {
            self.levels[n].rep_next_hop = sender;
            self.levels[n].rep_dist = msg_level.rep_dist + 1;
        }
    }

    /// Phase B preference rules, in priority order; the first match wins.
    /// `r` is the sender's candidate, already known eligible and distinct
    /// from our current rep.
    fn should_adopt(&self, _sender: u32, msg_levels: &[Level], n: usize, r: u32) -> bool {
        let our_rep = self.levels[n].rep;

        // Rule 1: we have no rep yet.
        if our_rep == 0 {
            return true;
        }

        let lower = &self.levels[n - 1];

        // Rule 2: our rep is a level-(n-1) peer of ours, R is our own
        // level-(n-1) rep, prefer R when our group is at least as large,
        // strictly on size, lower id on a tie.
        if let Some(our_rep_peer) = lower.peers.get(&our_rep) {
            if r == lower.rep {
                let our_degree = lower.peers.len() as u32;
                if our_degree > our_rep_peer.degree {
                    return true;
                }
                if our_degree == our_rep_peer.degree && r < our_rep {
                    return true;
                }
            }
        }

        // Rule 3: our rep equals our level-(n-1) rep, sender is in a
        // different level-(n-1) group (R is a level-(n-1) peer of ours)
        // with strictly larger degree than our own group's size, lower id
        // on a tie.
        let sender_in_different_group = self.levels[n - 1].rep != msg_levels[n - 1].rep;
        if our_rep == lower.rep && sender_in_different_group {
            if let Some(candidate) = lower.peers.get(&r) {
                let our_size = lower.peers.len() as u32;
                if candidate.degree > our_size {
                    return true;
                }
                if candidate.degree == our_size && r < our_rep {
                    return true;
                }
            }
        }

        // Rule 4: our rep is itself a level-(n-1) peer, sender is in yet
        // another level-(n-1) peer group, compare their reported degrees.
        if sender_in_different_group && lower.peers.contains_key(&our_rep) {
            if let (Some(our_rep_peer), Some(candidate)) =
                (lower.peers.get(&our_rep), lower.peers.get(&r))
            {
                if candidate.degree > our_rep_peer.degree {
                    return true;
                }
                if candidate.degree == our_rep_peer.degree && r < our_rep {
                    return true;
                }
            }
        }

        false
    }

    /// For every level the sender no longer carries, drop the stale route
    /// or representative state that depended on it (§4.8).
    pub(crate) fn trim_vacated_leaders_and_peers(&mut self, sender: u32, msg_levels: &[Level]) {
        for n in msg_levels.len()..self.levels.len() {
            if self.levels[n].rep != 0 && self.levels[n].rep_next_hop == sender {
                self.deselect_rep(n);
            } else {
                let to_remove: Vec<u32> = self.levels[n]
                    .peers
                    .iter()
                    .filter(|(_, peer)| peer.next_hop == sender)
                    .map(|(&key, _)| key)
                    .collect();
                for key in to_remove {
                    self.levels[n].peers.remove(&key);
                }
            }
        }
    }

    /// Lazy random self-promotion to representative of the top level (§4.9).
    pub fn try_to_become_rep(&mut self, rng: &mut impl Rng) {
        let h = self.levels.len() - 1;
        if h == 0 || self.levels[h].rep != 0 {
            return;
        }
        let lower = h - 1;
        if self.levels[lower].rep != self.my_id || self.levels[lower].peers.is_empty() {
            return;
        }
        let k = self.levels[lower].peers.len();
        let roll: f64 = rng.gen();
        if roll < 1.0 / (2.0 * k as f64) {
            self.levels[h].rep = self.my_id;
            self.levels[h].rep_next_hop = self.my_id;
            self.levels[h].rep_dist = 0;
            self.levels[h].reset_peers();
            self.emit(Event::Elect { level: h as u32 });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::NullSink;
    use rand::rngs::mock::StepRng;

    fn node(id: u32) -> NodeState {
        NodeState::new(id, id as f64, Box::new(NullSink))
    }

    #[test]
    fn adopts_sender_rep_when_unelected() {
        let mut a = node(1);
        a.levels.push(Level::new(1));
        a.levels[0].peers.insert(2, crate::types::PeerEntry::new(1, 2, 1));

        let mut msg0 = Level::new(0);
        msg0.rep = 2;
        let mut msg1 = Level::new(1);
        msg1.rep = 2;
        msg1.rep_dist = 0;

        a.handle_rep_election(2, &[msg0, msg1], 1);
        assert_eq!(a.levels[1].rep, 2);
        assert_eq!(a.levels[1].rep_next_hop, 2);
        assert_eq!(a.levels[1].rep_dist, 1);
    }

    #[test]
    fn phase_c_shortens_route_to_same_rep() {
        let mut a = node(1);
        a.levels.push(Level::new(1));
        a.levels[0].peers.insert(2, crate::types::PeerEntry::new(1, 2, 1));
        a.levels[1].rep = 2;
        a.levels[1].rep_next_hop = 2;
        a.levels[1].rep_dist = 5;

        let msg0 = Level::new(0);
        let mut msg1 = Level::new(1);
        msg1.rep = 2;
        msg1.rep_dist = 1;

        a.handle_rep_election(2, &[msg0, msg1], 1);
        assert_eq!(a.levels[1].rep_dist, 2);
        assert_eq!(a.levels[1].rep_next_hop, 2);
    }

    #[test]
    fn rules_3_and_4_ignore_candidates_forwarded_from_our_own_group() {
        let mut a = node(1);
        a.levels.push(Level::new(1));
        a.levels.push(Level::new(2));
        a.levels[1].rep = 1;
        a.levels[1].peers.insert(5, crate::types::PeerEntry::new(10, 5, 1));
        a.levels[2].rep = 1;
        a.levels[2].rep_next_hop = 1;
        a.levels[2].rep_dist = 0;

        let msg0 = Level::new(0);
        let mut msg1 = Level::new(1);
        msg1.rep = 1; // sender belongs to our own level-1 group
        let mut msg2 = Level::new(2);
        msg2.rep = 5; // a higher-degree peer's rep, merely forwarded
        msg2.rep_dist = 0;

        a.handle_rep_election(9, &[msg0, msg1, msg2], 2);
        assert_eq!(
            a.levels[2].rep, 1,
            "a same-group sender forwarding a peer-group rep must not flip our level-n rep"
        );
    }

    #[test]
    fn promotion_never_fires_with_zero_roll_above_threshold() {
        let mut a = node(1);
        a.levels.push(Level::new(1));
        a.levels[0].peers.insert(2, crate::types::PeerEntry::new(1, 2, 1));
        let mut rng = StepRng::new(u64::MAX / 2 + 1, 0);
        a.try_to_become_rep(&mut rng);
        assert_eq!(a.levels[1].rep, 0);
    }
}
