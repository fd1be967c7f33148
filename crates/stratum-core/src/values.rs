//! `UpdatePeerValues` (§4.10) and `RecalculateLevelValues` (§4.11).

use crate::node::NodeState;
use crate::types::Level;

impl NodeState {
    pub(crate) fn update_peer_values(&mut self, sender: u32, msg_levels: &[Level]) {
        let shared = self.levels.len().min(msg_levels.len());
        for (n, msg_level) in msg_levels.iter().enumerate().take(shared) {
            if self.levels[n].rep == msg_level.rep && self.levels[n].rep_next_hop == sender {
                self.levels[n].rep_value = msg_level.rep_value;
            }

            let same_group = self.levels[n].rep == msg_level.rep;
            let updates: Vec<(u32, f64)> = self.levels[n]
                .peers
                .iter()
                .filter(|(_, peer)| peer.next_hop == sender)
                .filter_map(|(&key, _)| {
                    if same_group {
                        msg_level.peers.get(&key).map(|p| (key, p.value))
                    } else {
                        Some((key, msg_level.rep_value))
                    }
                })
                .collect();
            for (key, value) in updates {
                if let Some(peer) = self.levels[n].peers.get_mut(&key) {
                    peer.value = value;
                }
            }
        }
    }

    pub(crate) fn recalculate_level_values(&mut self) {
        for n in 1..self.levels.len() {
            if self.levels[n].rep != self.my_id {
                continue;
            }
            let lower = &self.levels[n - 1];
            let mut values: Vec<f64> = lower.peers.values().map(|p| p.value).collect();
            values.push(lower.rep_value);
            self.levels[n].rep_value = median(&mut values);
        }
    }
}

/// Sorts `values` ascending and returns the median; on an even count, the
/// arithmetic mean of the two central elements.
fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    let len = values.len();
    if len % 2 == 1 {
        values[len / 2]
    } else {
        (values[len / 2 - 1] + values[len / 2]) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_odd_count() {
        let mut v = vec![0.9, 0.1, 0.5];
        assert_eq!(median(&mut v), 0.5);
    }

    #[test]
    fn median_even_count_averages_middle_two() {
        let mut v = vec![0.1, 0.2, 0.3, 0.4];
        assert_eq!(median(&mut v), 0.25);
    }

    #[test]
    fn median_tolerates_a_peer_supplied_nan_without_panicking() {
        let mut v = vec![0.1, f64::NAN, 0.5];
        median(&mut v);
    }
}
