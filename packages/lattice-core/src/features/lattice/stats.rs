//! Lattice size statistics

use serde::{Deserialize, Serialize};

use super::lattice::Lattice;
use super::topo_sort::sort_nodes;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatticeStats {
    pub name: String,
    pub nodes: usize,
    pub transitions: usize,
    pub reachable_nodes: usize,
    /// Transitions per reachable node
    pub density: f64,
}

impl LatticeStats {
    pub fn compute(lattice: &Lattice) -> Self {
        let reachable = sort_nodes(lattice).len();
        let transitions = lattice.num_transitions();
        Self {
            name: lattice.name().to_string(),
            nodes: lattice.num_nodes(),
            transitions,
            reachable_nodes: reachable,
            density: if reachable == 0 {
                0.0
            } else {
                transitions as f64 / reachable as f64
            },
        }
    }
}
