//! Topological ordering of lattice nodes
//!
//! Depth-first post-order from the initial node (or from the final node,
//! following incoming transitions), reversed. The traversal uses an explicit
//! stack: path lengths in long lattices exceed what recursion can handle.
//!
//! Nodes that cannot be reached are left out of the order. That is a soft
//! condition: a warning is logged and callers work on the reachable part.

use tracing::warn;

use super::lattice::Lattice;
use crate::shared::models::NodeIndex;

/// Traversal direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// From the initial node along outgoing transitions
    Forward,
    /// From the final node along incoming transitions
    Backward,
}

/// Reachable nodes in topological order, initial node first
pub fn sort_nodes(lattice: &Lattice) -> Vec<NodeIndex> {
    sort_nodes_directed(lattice, Direction::Forward)
}

/// Nodes that reach the final node, in reverse topological order (final
/// node first)
pub fn sort_nodes_reverse(lattice: &Lattice) -> Vec<NodeIndex> {
    sort_nodes_directed(lattice, Direction::Backward)
}

pub fn sort_nodes_directed(lattice: &Lattice, direction: Direction) -> Vec<NodeIndex> {
    let start = match direction {
        Direction::Forward => lattice.initial(),
        Direction::Backward => lattice.final_node(),
    };
    if !lattice.contains(start) {
        warn!(
            lattice = lattice.name(),
            node = start,
            "start node of topological sort does not exist"
        );
        return Vec::new();
    }

    let neighbors = |index: NodeIndex| -> Vec<NodeIndex> {
        let mut next = match direction {
            Direction::Forward => lattice.successors(index),
            Direction::Backward => lattice.predecessors(index),
        };
        // deterministic order regardless of adjacency backend
        next.sort_unstable();
        next
    };

    let mut visited = vec![false; lattice.max_index() as usize];
    let mut post_order = Vec::with_capacity(lattice.num_nodes());
    // (node, its neighbors, next neighbor to visit)
    let mut stack: Vec<(NodeIndex, Vec<NodeIndex>, usize)> = Vec::new();

    visited[start as usize] = true;
    stack.push((start, neighbors(start), 0));

    while let Some((node, next, cursor)) = stack.last_mut() {
        if *cursor < next.len() {
            let child = next[*cursor];
            *cursor += 1;
            if !visited[child as usize] {
                visited[child as usize] = true;
                stack.push((child, neighbors(child), 0));
            }
        } else {
            post_order.push(*node);
            stack.pop();
        }
    }

    post_order.reverse();

    if post_order.len() != lattice.num_nodes() {
        warn!(
            lattice = lattice.name(),
            reached = post_order.len(),
            total = lattice.num_nodes(),
            ?direction,
            "lattice has unreachable nodes"
        );
    }

    post_order
}

/// Position of every node in `order`, indexed by node index
pub fn order_positions(lattice: &Lattice, order: &[NodeIndex]) -> Vec<Option<usize>> {
    let mut positions = vec![None; lattice.max_index() as usize];
    for (pos, &node) in order.iter().enumerate() {
        positions[node as usize] = Some(pos);
    }
    positions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{CombinePolicy, Transition};

    fn diamond() -> Lattice {
        // 0 -> 1 -> 3, 0 -> 2 -> 3, plus isolated node 4
        let mut lat = Lattice::new("diamond");
        for i in 0..5 {
            lat.insert_node(i, Some(i));
        }
        lat.set_initial(0);
        lat.set_final(3);
        for (f, t) in [(0, 1), (0, 2), (1, 3), (2, 3), (1, 2)] {
            lat.insert_transition(f, t, Transition::new(0.0), CombinePolicy::Max)
                .unwrap();
        }
        lat
    }

    #[test]
    fn test_forward_order_respects_edges() {
        let lat = diamond();
        let order = sort_nodes(&lat);
        assert_eq!(order.len(), 4);
        assert_eq!(order[0], 0);
        let pos = order_positions(&lat, &order);
        for &u in &order {
            for v in lat.successors(u) {
                assert!(pos[u as usize] < pos[v as usize], "{} before {}", u, v);
            }
        }
    }

    #[test]
    fn test_reverse_order_starts_at_final() {
        let lat = diamond();
        let order = sort_nodes_reverse(&lat);
        assert_eq!(order[0], 3);
        assert_eq!(*order.last().unwrap(), 0);
        assert!(!order.contains(&4));
    }

    #[test]
    fn test_self_loop_does_not_break_sort() {
        let mut lat = diamond();
        lat.insert_transition(1, 1, Transition::new(-0.3), CombinePolicy::Max)
            .unwrap();
        let order = sort_nodes(&lat);
        assert_eq!(order.len(), 4);
    }

    #[test]
    fn test_long_chain_uses_no_recursion() {
        let mut lat = Lattice::new("chain");
        let n = 200_000u32;
        for i in 0..n {
            lat.insert_node(i, Some(1));
        }
        for i in 0..n - 1 {
            lat.insert_transition(i, i + 1, Transition::new(0.0), CombinePolicy::Max)
                .unwrap();
        }
        lat.set_initial(0);
        lat.set_final(n - 1);
        let order = sort_nodes(&lat);
        assert_eq!(order.len(), n as usize);
        assert_eq!(order[0], 0);
    }
}
