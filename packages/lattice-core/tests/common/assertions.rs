//! Custom assertions for lattice verification

use lattice_core::features::lattice::{order_positions, sort_nodes};
use lattice_core::features::posterior::best_path;
use lattice_core::shared::ports::Vocabulary;
use lattice_core::Lattice;

/// Assert that every transition is recorded on both of its endpoints
pub fn assert_consistent(lattice: &Lattice) {
    if let Err(err) = lattice.check_consistency() {
        panic!("lattice '{}' is inconsistent: {}", lattice.name(), err);
    }
}

/// Assert that the topological order puts every source before its target
pub fn assert_topological(lattice: &Lattice) {
    let order = sort_nodes(lattice);
    let positions = order_positions(lattice, &order);
    for &from in &order {
        for to in lattice.successors(from) {
            if to == from {
                continue;
            }
            let (Some(f), Some(t)) = (positions[from as usize], positions[to as usize]) else {
                panic!("reachable transition {} -> {} missing from order", from, to);
            };
            assert!(f < t, "{} -> {} out of order ({} >= {})", from, to, f, t);
        }
    }
}

/// Words on the best path, epsilon nodes skipped
pub fn best_words(lattice: &Lattice, vocab: &dyn Vocabulary) -> Vec<String> {
    let path = best_path(lattice).expect("lattice has a complete path");
    path.nodes
        .iter()
        .filter_map(|&node| lattice.word(node).flatten())
        .map(|word| vocab.label_to_string(Some(word)))
        .collect()
}

/// Words labelling live nodes, sorted
pub fn node_words(lattice: &Lattice, vocab: &dyn Vocabulary) -> Vec<String> {
    let mut words: Vec<String> = lattice
        .node_indices()
        .into_iter()
        .filter_map(|node| lattice.word(node).flatten())
        .map(|word| vocab.label_to_string(Some(word)))
        .collect();
    words.sort();
    words
}
