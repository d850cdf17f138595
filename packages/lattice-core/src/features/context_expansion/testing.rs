//! Deterministic language model for expansion tests

use crate::features::lattice::Lattice;
use crate::shared::models::{CombinePolicy, NodeIndex, NodeLabel, Transition, WordId};
use crate::shared::ports::LanguageModel;
use crate::shared::utils::log_prob::LogP;

/// Every distinct (word, context) pair gets a distinct score; contexts are
/// capped at `order - 1` words.
pub(crate) struct ScoreLm {
    pub order: usize,
}

impl ScoreLm {
    pub fn score(word: WordId, context: &[WordId]) -> LogP {
        let history: f64 = context
            .iter()
            .enumerate()
            .map(|(i, &c)| (c as f64 + 1.0) / 100f64.powi(i as i32 + 1))
            .sum();
        -(word as f64 + 1.0) / 10.0 - history
    }
}

impl LanguageModel for ScoreLm {
    fn order(&self) -> usize {
        self.order
    }

    fn word_prob(&self, word: WordId, context: &[WordId]) -> LogP {
        let used = context.len().min(self.order - 1);
        Self::score(word, &context[..used])
    }

    fn context_length_used(&self, context: &[WordId]) -> usize {
        context.len().min(self.order - 1)
    }

    fn backoff_weight(&self, _context: &[WordId]) -> LogP {
        0.0
    }
}

pub(crate) fn build(words: &[NodeLabel], edges: &[(NodeIndex, NodeIndex, LogP)]) -> Lattice {
    let mut lat = Lattice::new("expand");
    for (i, w) in words.iter().enumerate() {
        lat.insert_node(i as NodeIndex, *w);
    }
    lat.set_initial(0);
    lat.set_final(words.len() as NodeIndex - 1);
    for &(f, t, w) in edges {
        lat.insert_transition(f, t, Transition::new(w), CombinePolicy::Max)
            .unwrap();
    }
    lat
}

/// Nodes carrying `word`
pub(crate) fn nodes_with(lat: &Lattice, word: WordId) -> Vec<NodeIndex> {
    lat.node_indices()
        .into_iter()
        .filter(|&n| lat.word(n) == Some(Some(word)))
        .collect()
}
