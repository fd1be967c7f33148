//! Gossip send scheduler: a recurring randomized-interval timer that,
//! on each tick, hands back one uniformly chosen neighbor.
//!
//! Grounded on `udp-gossip.cc`'s `ScheduleTransmit(MilliSeconds(rand() %
//! 100))` / `Send` pair: re-arm with a fresh `[0, 100)` ms delay, pick a
//! neighbor uniformly at random, send, repeat.

use rand::Rng;
use tokio::time::{sleep, Duration};

pub struct GossipTimer {
    max_delay_ms: u64,
}

impl Default for GossipTimer {
    fn default() -> Self {
        Self { max_delay_ms: 100 }
    }
}

impl GossipTimer {
    pub fn new(max_delay_ms: u64) -> Self {
        Self { max_delay_ms }
    }

    /// Sleeps a uniformly random `[0, max_delay_ms)` interval.
    pub async fn tick(&self, rng: &mut impl Rng) {
        let delay = rng.gen_range(0..self.max_delay_ms.max(1));
        sleep(Duration::from_millis(delay)).await;
    }

    /// Picks one neighbor uniformly at random from `neighbors`.
    pub fn pick_neighbor(neighbors: &[u32], rng: &mut impl Rng) -> Option<u32> {
        if neighbors.is_empty() {
            return None;
        }
        let idx = rng.gen_range(0..neighbors.len());
        Some(neighbors[idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    #[test]
    fn pick_neighbor_is_none_with_no_neighbors() {
        let mut rng = StepRng::new(0, 1);
        assert_eq!(GossipTimer::pick_neighbor(&[], &mut rng), None);
    }

    #[test]
    fn pick_neighbor_selects_from_the_list() {
        let mut rng = StepRng::new(0, 1);
        let neighbors = vec![7, 8, 9];
        let picked = GossipTimer::pick_neighbor(&neighbors, &mut rng).unwrap();
        assert!(neighbors.contains(&picked));
    }
}
