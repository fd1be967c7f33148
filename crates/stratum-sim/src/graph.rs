//! Random connected graph construction, the `stratum-net` analog of
//! `dmc.cc`'s ns-3 node-container wiring: a random spanning tree
//! guarantees connectivity, then extra random edges densify it.

use std::collections::{HashMap, HashSet};

use rand::Rng;

/// Adjacency list keyed by node id, ids `1..=num_nodes` (0 is reserved as
/// "none" per the identifier convention).
pub fn build_graph(num_nodes: u32, branch_factor: u32, rng: &mut impl Rng) -> HashMap<u32, HashSet<u32>> {
    let mut adjacency: HashMap<u32, HashSet<u32>> = (1..=num_nodes).map(|id| (id, HashSet::new())).collect();
    if num_nodes < 2 {
        return adjacency;
    }

    for i in 2..=num_nodes {
        let j = rng.gen_range(1..i);
        connect(&mut adjacency, i, j);
    }

    let extra_edges = num_nodes as u64 * branch_factor as u64;
    for _ in 0..extra_edges {
        let a = rng.gen_range(1..=num_nodes);
        let b = rng.gen_range(1..=num_nodes);
        if a != b {
            connect(&mut adjacency, a, b);
        }
    }

    adjacency
}

fn connect(adjacency: &mut HashMap<u32, HashSet<u32>>, a: u32, b: u32) {
    adjacency.get_mut(&a).unwrap().insert(b);
    adjacency.get_mut(&b).unwrap().insert(a);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn graph_is_connected() {
        let mut rng = StdRng::seed_from_u64(42);
        let adjacency = build_graph(20, 2, &mut rng);
        assert!(is_connected(&adjacency));
    }

    #[test]
    fn no_self_loops() {
        let mut rng = StdRng::seed_from_u64(7);
        let adjacency = build_graph(15, 3, &mut rng);
        for (&id, neighbors) in &adjacency {
            assert!(!neighbors.contains(&id));
        }
    }

    fn is_connected(adjacency: &HashMap<u32, HashSet<u32>>) -> bool {
        let Some(&start) = adjacency.keys().next() else {
            return true;
        };
        let mut seen = HashSet::new();
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            if seen.insert(node) {
                stack.extend(adjacency[&node].iter().copied());
            }
        }
        seen.len() == adjacency.len()
    }
}
