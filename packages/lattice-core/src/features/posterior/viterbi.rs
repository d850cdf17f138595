//! Viterbi best path (max-product over the topological order)

use crate::features::lattice::{order_positions, sort_nodes, Lattice};
use crate::shared::models::NodeIndex;
use crate::shared::utils::log_prob::{LogP, LOG_P_ONE, LOG_P_ZERO};

#[derive(Debug, Clone, PartialEq)]
pub struct BestPath {
    pub weight: LogP,
    /// Node indices from initial to final
    pub nodes: Vec<NodeIndex>,
}

/// Highest-weight path from initial to final.
///
/// Only transitions that move forward in the topological order are taken, so
/// self-loops and back transitions of cyclic lattices are ignored.
pub fn best_path(lattice: &Lattice) -> Option<BestPath> {
    let order = sort_nodes(lattice);
    let initial = lattice.initial();
    if order.first() != Some(&initial) {
        return None;
    }

    let positions = order_positions(lattice, &order);
    let size = lattice.max_index() as usize;
    let mut score = vec![LOG_P_ZERO; size];
    let mut back: Vec<Option<NodeIndex>> = vec![None; size];
    score[initial as usize] = LOG_P_ONE;

    for &node in &order {
        let here = score[node as usize];
        if here == LOG_P_ZERO {
            continue;
        }
        let here_pos = positions[node as usize];
        for (next, transition) in lattice.out_transitions(node) {
            if positions[next as usize] <= here_pos {
                continue;
            }
            let candidate = here + transition.weight;
            let n = next as usize;
            // ties go to the lower predecessor index
            let better = candidate > score[n]
                || (candidate == score[n] && back[n].map_or(true, |b| node < b));
            if better {
                score[n] = candidate;
                back[n] = Some(node);
            }
        }
    }

    let final_node = lattice.final_node();
    let weight = *score.get(final_node as usize)?;
    if weight == LOG_P_ZERO {
        return None;
    }

    let mut nodes = vec![final_node];
    let mut cursor = final_node;
    while let Some(prev) = back[cursor as usize] {
        if nodes.len() > order.len() {
            return None;
        }
        nodes.push(prev);
        cursor = prev;
    }
    nodes.reverse();
    Some(BestPath { weight, nodes })
}
