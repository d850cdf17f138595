//! Re-expansion of a lattice to a longer language-model context
//!
//! The input lattice is assumed to carry bigram weights. Expansion
//! duplicates nodes so that every node has a unique history of the target
//! length, and rescores outgoing transitions with the language model.
//! Expansion works on a copy: when the node budget is exhausted the
//! lattice is left untouched and [`ExpandOutcome::BudgetExceeded`] is
//! returned.

pub mod ngram;
pub mod trigram;

#[cfg(test)]
pub(crate) mod testing;

pub use ngram::expand_ngram;
pub use trigram::expand_trigram;

use tracing::{info, warn};

use crate::config::ExpandConfig;
use crate::errors::{LatticeError, Result};
use crate::features::lattice::Lattice;
use crate::shared::models::{NodeIndex, WordId};
use crate::shared::ports::{LanguageModel, Vocabulary};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpandOutcome {
    Completed { nodes_before: usize, nodes_after: usize },
    /// The expansion needed more than `limit` nodes and was abandoned
    BudgetExceeded { limit: usize },
}

impl ExpandOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, ExpandOutcome::Completed { .. })
    }
}

/// Why an expansion stopped early
#[derive(Debug)]
pub(crate) enum ExpandFailure {
    Budget,
    Lattice(LatticeError),
}

impl From<LatticeError> for ExpandFailure {
    fn from(err: LatticeError) -> Self {
        ExpandFailure::Lattice(err)
    }
}

/// Node count guard used while expanding
#[derive(Debug, Clone, Copy)]
pub(crate) struct NodeBudget {
    limit: usize,
}

impl NodeBudget {
    pub(crate) fn new(limit: usize) -> Self {
        Self { limit }
    }

    /// Allocate a node on `lattice` unless that would pass the limit
    pub(crate) fn allocate(
        &self,
        lattice: &mut Lattice,
        word: Option<WordId>,
    ) -> std::result::Result<NodeIndex, ExpandFailure> {
        if self.limit > 0 && lattice.num_nodes() >= self.limit {
            warn!(
                lattice = lattice.name(),
                limit = self.limit,
                "node budget exhausted, abandoning expansion"
            );
            return Err(ExpandFailure::Budget);
        }
        Ok(lattice.add_node(word))
    }
}

/// Run `expand` on a copy of `lattice` and commit it on success
pub(crate) fn expand_on_copy(
    lattice: &mut Lattice,
    limit: usize,
    expand: impl FnOnce(&mut Lattice, &NodeBudget) -> std::result::Result<(), ExpandFailure>,
) -> Result<ExpandOutcome> {
    let nodes_before = lattice.num_nodes();
    let mut work = lattice.clone();
    match expand(&mut work, &NodeBudget::new(limit)) {
        Ok(()) => {
            let nodes_after = work.num_nodes();
            *lattice = work;
            info!(lattice = lattice.name(), nodes_before, nodes_after, "context expanded");
            Ok(ExpandOutcome::Completed {
                nodes_before,
                nodes_after,
            })
        }
        Err(ExpandFailure::Budget) => Ok(ExpandOutcome::BudgetExceeded { limit }),
        Err(ExpandFailure::Lattice(err)) => Err(err),
    }
}

/// Word a node contributes to the history of its successors. An epsilon
/// initial node stands for the sentence start; other epsilon nodes
/// contribute nothing.
pub(crate) fn history_word(lattice: &Lattice, vocab: &dyn Vocabulary, node: NodeIndex) -> Option<WordId> {
    match lattice.word(node).flatten() {
        Some(word) => Some(word),
        None if node == lattice.initial() => Some(vocab.sentence_start()),
        None => None,
    }
}

/// Word predicted when entering `node`. An epsilon final node predicts the
/// sentence end; other epsilon nodes predict nothing.
pub(crate) fn predicted_word(lattice: &Lattice, vocab: &dyn Vocabulary, node: NodeIndex) -> Option<WordId> {
    match lattice.word(node).flatten() {
        Some(word) => Some(word),
        None if node == lattice.final_node() => Some(vocab.sentence_end()),
        None => None,
    }
}

/// Expand to `config.order`: the cached trigram expander for order 3, the
/// general n-gram expander otherwise
pub fn expand_context(
    lattice: &mut Lattice,
    lm: &dyn LanguageModel,
    vocab: &dyn Vocabulary,
    config: &ExpandConfig,
) -> Result<ExpandOutcome> {
    if config.order == 3 {
        expand_trigram(lattice, lm, vocab, config)
    } else {
        expand_ngram(lattice, lm, vocab, config)
    }
}
