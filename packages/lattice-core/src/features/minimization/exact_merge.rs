//! Exact node merging
//!
//! Two nodes can be merged without changing the lattice's language when they
//! carry the same word and either share all predecessors (forward pass) or
//! share all successors (backward pass). Candidates are found among the
//! successors (resp. predecessors) of each node, which is where such pairs
//! live. Weights are ignored when comparing neighbor sets; parallel
//! transitions created by a merge are combined under the configured policy.

use std::collections::BTreeMap;

use tracing::debug;

use crate::config::MergeConfig;
use crate::errors::Result;
use crate::features::lattice::{sort_nodes, sort_nodes_reverse, Direction, Lattice};
use crate::shared::models::{CombinePolicy, NodeIndex, NodeLabel};

/// Neighbors of `node` in `direction`, grouped by word label. Groups with a
/// single member are dropped.
pub(super) fn label_groups(
    lattice: &Lattice,
    node: NodeIndex,
    direction: Direction,
) -> Vec<Vec<NodeIndex>> {
    let neighbors = match direction {
        Direction::Forward => lattice.successors(node),
        Direction::Backward => lattice.predecessors(node),
    };
    let mut groups: BTreeMap<NodeLabel, Vec<NodeIndex>> = BTreeMap::new();
    for neighbor in neighbors {
        if neighbor == node {
            continue;
        }
        if let Some(word) = lattice.word(neighbor) {
            groups.entry(word).or_default().push(neighbor);
        }
    }
    groups
        .into_values()
        .filter(|g| g.len() > 1)
        .map(|mut g| {
            g.sort_unstable();
            g
        })
        .collect()
}

/// Neighbor set compared between merge candidates found in `direction`
pub(super) fn opposite_set(lattice: &Lattice, node: NodeIndex, direction: Direction) -> Vec<NodeIndex> {
    let mut set = match direction {
        Direction::Forward => lattice.predecessors(node),
        Direction::Backward => lattice.successors(node),
    };
    set.sort_unstable();
    set
}

pub(super) fn is_terminal(lattice: &Lattice, node: NodeIndex) -> bool {
    node == lattice.initial() || node == lattice.final_node()
}

/// One exact pass over the lattice. Returns the number of merged nodes.
pub fn merge_pass(lattice: &mut Lattice, direction: Direction, policy: CombinePolicy) -> Result<usize> {
    let order = match direction {
        Direction::Forward => sort_nodes(lattice),
        Direction::Backward => sort_nodes_reverse(lattice),
    };
    let mut merged = 0;

    for node in order {
        if !lattice.contains(node) {
            continue;
        }
        for group in label_groups(lattice, node, direction) {
            for (i, &keep) in group.iter().enumerate() {
                if !lattice.contains(keep) || is_terminal(lattice, keep) {
                    continue;
                }
                let keep_set = opposite_set(lattice, keep, direction);
                for &other in &group[i + 1..] {
                    if !lattice.contains(other) || is_terminal(lattice, other) {
                        continue;
                    }
                    if opposite_set(lattice, other, direction) == keep_set {
                        lattice.merge_nodes(keep, other, policy)?;
                        merged += 1;
                    }
                }
            }
        }
    }

    debug!(lattice = lattice.name(), ?direction, merged, "exact merge pass");
    Ok(merged)
}

/// Exact merging until the node count stops shrinking, alternating forward
/// and backward passes. `fast` runs a single backward pass.
pub fn merge_exact(lattice: &mut Lattice, config: &MergeConfig) -> Result<usize> {
    if config.fast {
        return merge_pass(lattice, Direction::Backward, config.combine);
    }

    let mut total = 0;
    loop {
        let before = lattice.num_nodes();
        total += merge_pass(lattice, Direction::Forward, config.combine)?;
        total += merge_pass(lattice, Direction::Backward, config.combine)?;
        if lattice.num_nodes() == before {
            break;
        }
    }
    Ok(total)
}
