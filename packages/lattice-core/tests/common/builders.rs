//! Test data builders
//!
//! This module provides a builder for small lattices written in terms of
//! word strings and probabilities.

use lattice_core::shared::models::{CombinePolicy, NodeIndex, Transition};
use lattice_core::shared::ports::{SymbolTable, Vocabulary};
use lattice_core::shared::utils::log_prob::{intlog_to_log_p, prob_to_log_p, LogP};
use lattice_core::Lattice;

/// Builder for lattices; nodes get consecutive indices starting at 0
pub struct LatticeBuilder {
    lattice: Lattice,
    next: NodeIndex,
}

impl LatticeBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            lattice: Lattice::new(name),
            next: 0,
        }
    }

    /// Add a node labelled `label` (`"NULL"` for epsilon) and return its index
    pub fn node(&mut self, vocab: &mut SymbolTable, label: &str) -> NodeIndex {
        let index = self.next;
        self.lattice.insert_node(index, vocab.label_from_str(label));
        self.next += 1;
        index
    }

    pub fn edge(&mut self, from: NodeIndex, to: NodeIndex, weight: LogP) -> &mut Self {
        self.lattice
            .insert_transition(from, to, Transition::new(weight), CombinePolicy::Max)
            .unwrap();
        self
    }

    pub fn edge_prob(&mut self, from: NodeIndex, to: NodeIndex, prob: f64) -> &mut Self {
        self.edge(from, to, prob_to_log_p(prob))
    }

    pub fn edge_intlog(&mut self, from: NodeIndex, to: NodeIndex, intlog: i64) -> &mut Self {
        self.edge(from, to, intlog_to_log_p(intlog))
    }

    pub fn build(mut self, initial: NodeIndex, final_node: NodeIndex) -> Lattice {
        self.lattice.set_initial(initial);
        self.lattice.set_final(final_node);
        self.lattice
    }
}

/// A chain `NULL w1 ... wn NULL` with probability-one transitions
pub fn chain(name: &str, vocab: &mut SymbolTable, words: &str) -> Lattice {
    let mut builder = LatticeBuilder::new(name);
    let mut previous = builder.node(vocab, "NULL");
    let start = previous;
    for word in words.split_whitespace() {
        let node = builder.node(vocab, word);
        builder.edge(previous, node, 0.0);
        previous = node;
    }
    let end = builder.node(vocab, "NULL");
    builder.edge(previous, end, 0.0);
    builder.build(start, end)
}
