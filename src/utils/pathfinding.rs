//! # Pathfinding Algorithms
//!
//! Thin wrappers over the `pathfinding` crate for unit-cost graphs such as the room grid.

use ::pathfinding::prelude::{bfs, bfs_reach, dijkstra_all};
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Every node reachable from `start`, including `start` itself.
pub fn reachable_set<N, F, I>(start: N, successors: F) -> HashSet<N>
where
    N: Eq + Hash + Clone,
    F: FnMut(&N) -> I,
    I: IntoIterator<Item = N>,
{
    bfs_reach(start, successors).collect()
}

/// Shortest path from `start` to the first node satisfying `goal`, both ends included.
pub fn shortest_route<N, F, I, G>(start: &N, successors: F, goal: G) -> Option<Vec<N>>
where
    N: Eq + Hash + Clone,
    F: FnMut(&N) -> I,
    I: IntoIterator<Item = N>,
    G: FnMut(&N) -> bool,
{
    bfs(start, successors, goal)
}

/// Hop count from `start` to every reachable node. `start` maps to 0.
pub fn hop_distances<N, F, I>(start: &N, mut successors: F) -> HashMap<N, usize>
where
    N: Eq + Hash + Clone,
    F: FnMut(&N) -> I,
    I: IntoIterator<Item = N>,
{
    let mut distances: HashMap<N, usize> = dijkstra_all(start, |node| {
        successors(node)
            .into_iter()
            .map(|next| (next, 1usize))
            .collect::<Vec<_>>()
    })
    .into_iter()
    .map(|(node, (_parent, cost))| (node, cost))
    .collect();
    distances.insert(start.clone(), 0);
    distances
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_graph(n: &u32) -> Vec<u32> {
        let mut next = Vec::new();
        if *n > 0 {
            next.push(n - 1);
        }
        if *n < 5 {
            next.push(n + 1);
        }
        next
    }

    #[test]
    fn test_reachable_set_covers_line() {
        let reached = reachable_set(0u32, line_graph);
        assert_eq!(reached.len(), 6);
    }

    #[test]
    fn test_shortest_route_endpoints() {
        let route = shortest_route(&1u32, line_graph, |n| *n == 4).unwrap();
        assert_eq!(route, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_hop_distances() {
        let distances = hop_distances(&0u32, line_graph);
        assert_eq!(distances[&0], 0);
        assert_eq!(distances[&5], 5);
    }
}
