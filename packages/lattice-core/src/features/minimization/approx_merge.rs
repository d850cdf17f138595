//! Approximate node merging
//!
//! Breadth-first from the final node (backward) or the initial node
//! (forward). At each dequeued node, neighbors sharing a word are merged when
//! their opposite-direction neighbor sets overlap by at least
//! `overlap_ratio` of the smaller set (or of the larger one when
//! `overlap_base_larger` is set). The weaker candidate, judged by its
//! transition to the current node, is folded into the stronger one.

use std::collections::VecDeque;

use tracing::debug;

use super::exact_merge::{is_terminal, label_groups, opposite_set};
use crate::config::MergeConfig;
use crate::errors::Result;
use crate::features::lattice::{Direction, Lattice};
use crate::shared::models::{NodeFlags, NodeIndex};
use crate::shared::utils::log_prob::{LogP, LOG_P_ZERO};

/// True when `b_set` contains at least `threshold` entries of `a_set`.
/// Both sets must be sorted.
fn sets_overlap(a_set: &[NodeIndex], b_set: &[NodeIndex], threshold: usize) -> bool {
    let mut budget = a_set.len() as isize - threshold as isize;
    if budget < 0 {
        return false;
    }
    for entry in a_set {
        if b_set.binary_search(entry).is_err() {
            budget -= 1;
            if budget < 0 {
                return false;
            }
        }
    }
    true
}

fn overlap_threshold(ratio: f64, a: usize, b: usize, base_larger: bool) -> usize {
    let base = if base_larger { a.max(b) } else { a.min(b) };
    (ratio * base as f64) as usize
}

fn connected(lattice: &Lattice, a: NodeIndex, b: NodeIndex) -> bool {
    lattice.find_transition(a, b).is_some() || lattice.find_transition(b, a).is_some()
}

/// Weight of the transition linking a candidate to the node it was found from
fn strength(lattice: &Lattice, node: NodeIndex, candidate: NodeIndex, direction: Direction) -> LogP {
    let transition = match direction {
        Direction::Forward => lattice.find_transition(node, candidate),
        Direction::Backward => lattice.find_transition(candidate, node),
    };
    transition.map(|t| t.weight).unwrap_or(LOG_P_ZERO)
}

/// Run one approximate pass. Returns the number of merged nodes.
pub fn merge_approximate(lattice: &mut Lattice, config: &MergeConfig, direction: Direction) -> Result<usize> {
    if config.overlap_ratio <= 0.0 {
        return Ok(0);
    }
    let start = match direction {
        Direction::Forward => lattice.initial(),
        Direction::Backward => lattice.final_node(),
    };
    if !lattice.contains(start) {
        return Ok(0);
    }

    lattice.clear_node_flags(NodeFlags::MARKED);
    let mut queue = VecDeque::from([start]);
    let mut merged = 0;

    while let Some(node) = queue.pop_front() {
        if !lattice.contains(node) || lattice.node_has_flags(node, NodeFlags::MARKED) {
            continue;
        }
        lattice.mark_node(node, NodeFlags::MARKED);

        for group in label_groups(lattice, node, direction) {
            for (i, &first) in group.iter().enumerate() {
                for &second in &group[i + 1..] {
                    if !lattice.contains(first) || !lattice.contains(second) {
                        continue;
                    }
                    if is_terminal(lattice, first) || is_terminal(lattice, second) {
                        continue;
                    }
                    if connected(lattice, first, second) {
                        continue;
                    }
                    let first_set = opposite_set(lattice, first, direction);
                    let second_set = opposite_set(lattice, second, direction);
                    let threshold = overlap_threshold(
                        config.overlap_ratio,
                        first_set.len(),
                        second_set.len(),
                        config.overlap_base_larger,
                    );
                    if !sets_overlap(&first_set, &second_set, threshold) {
                        continue;
                    }

                    let (keep, drop) = if strength(lattice, node, second, direction)
                        > strength(lattice, node, first, direction)
                    {
                        (second, first)
                    } else {
                        (first, second)
                    };
                    lattice.merge_nodes(keep, drop, config.combine)?;
                    merged += 1;
                }
            }
        }

        let next = match direction {
            Direction::Forward => lattice.successors(node),
            Direction::Backward => lattice.predecessors(node),
        };
        let mut next: Vec<_> = next
            .into_iter()
            .filter(|&n| n != node && !lattice.node_has_flags(n, NodeFlags::MARKED))
            .collect();
        next.sort_unstable();
        for n in next {
            if queue.back() != Some(&n) {
                queue.push_back(n);
            }
        }
    }

    lattice.clear_node_flags(NodeFlags::MARKED);
    debug!(lattice = lattice.name(), ?direction, merged, "approximate merge pass");
    Ok(merged)
}
