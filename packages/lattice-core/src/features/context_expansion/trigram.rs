//! Bigram to trigram expansion with a duplication cache
//!
//! Nodes are visited in topological order. A node `n` with word `w` is
//! replaced by one context node per predecessor word `u`; the context node
//! inherits the incoming transitions from predecessors with word `u` and
//! gets outgoing transitions rescored as `P(s | u w)`. Context nodes are
//! cached by `u` and reused while their cached outgoing weights agree with
//! the recomputed ones within the tolerance.
//!
//! A self-loop on `n` becomes a "post" node carrying the loop under the
//! `w w` history (or the `w` history when the model has no such trigram
//! context); each context node links to it with `P(w | u w)`.

use rustc_hash::FxHashMap;
use tracing::debug;

use super::{expand_on_copy, history_word, predicted_word, ExpandFailure, ExpandOutcome, NodeBudget};
use crate::config::ExpandConfig;
use crate::errors::Result;
use crate::features::lattice::{sort_nodes, Lattice};
use crate::shared::models::{CombinePolicy, NodeIndex, Transition, TransitionFlags, WordId};
use crate::shared::ports::{LanguageModel, Vocabulary};
use crate::shared::utils::log_prob::LogP;

/// Most recent context node created for one predecessor word
#[derive(Debug, Clone)]
struct ContextEntry {
    node: NodeIndex,
    outgoing: Vec<(NodeIndex, LogP)>,
}

struct Expander<'a> {
    lm: &'a dyn LanguageModel,
    vocab: &'a dyn Vocabulary,
    tolerance: f64,
}

/// An outgoing transition of the node being expanded
#[derive(Debug, Clone, Copy)]
struct Exit {
    to: NodeIndex,
    /// Word predicted on entering `to`; `None` keeps the old weight
    predicts: Option<WordId>,
    transition: Transition,
}

impl Exit {
    fn rescored(&self, lm: &dyn LanguageModel, history: &[WordId]) -> LogP {
        match self.predicts {
            Some(word) => lm.word_prob(word, history),
            None => self.transition.weight,
        }
    }
}

fn within(a: LogP, b: LogP, tolerance: f64) -> bool {
    a == b || (a - b).abs() <= tolerance
}

impl Expander<'_> {
    fn expand_node(
        &self,
        lattice: &mut Lattice,
        budget: &NodeBudget,
        node: NodeIndex,
        word: WordId,
    ) -> std::result::Result<(), ExpandFailure> {
        let mut incoming = lattice.in_transitions(node);
        incoming.retain(|(from, _)| *from != node);
        incoming.sort_unstable_by_key(|(from, _)| *from);

        let mut exits: Vec<Exit> = lattice
            .out_transitions(node)
            .into_iter()
            .filter(|(to, _)| *to != node)
            .map(|(to, transition)| Exit {
                to,
                predicts: predicted_word(lattice, self.vocab, to),
                transition,
            })
            .collect();
        exits.sort_unstable_by_key(|e| e.to);

        // successor side first: context nodes link to the post node
        let post = match lattice.self_loop(node) {
            None => None,
            Some(self_loop) => Some(self.build_post_node(lattice, budget, word, &exits, self_loop.flags)?),
        };

        let mut cache: FxHashMap<Option<WordId>, ContextEntry> = FxHashMap::default();
        for (from, transition_in) in incoming {
            let prev = history_word(lattice, self.vocab, from);
            let history: Vec<WordId> = std::iter::once(word).chain(prev).collect();

            // anything that is not an exit is the post node
            let outgoing_weight = |to: NodeIndex| -> LogP {
                match exits.iter().find(|e| e.to == to) {
                    Some(exit) => exit.rescored(self.lm, &history),
                    None => self.lm.word_prob(word, &history),
                }
            };

            let reusable = cache
                .get(&prev)
                .filter(|entry| {
                    entry
                        .outgoing
                        .iter()
                        .all(|&(to, cached)| within(outgoing_weight(to), cached, self.tolerance))
                })
                .map(|entry| entry.node);

            let target = match reusable {
                Some(node) => node,
                None => {
                    let context_node = budget.allocate(lattice, Some(word))?;
                    let mut outgoing = Vec::with_capacity(exits.len() + 1);
                    for exit in &exits {
                        let weight = exit.rescored(self.lm, &history);
                        lattice.insert_transition(
                            context_node,
                            exit.to,
                            Transition::with_flags(weight, exit.transition.flags),
                            CombinePolicy::Max,
                        )?;
                        outgoing.push((exit.to, weight));
                    }
                    if let Some(post) = post {
                        let weight = self.lm.word_prob(word, &history);
                        lattice.insert_transition(context_node, post, Transition::new(weight), CombinePolicy::Max)?;
                        outgoing.push((post, weight));
                    }
                    cache.insert(
                        prev,
                        ContextEntry {
                            node: context_node,
                            outgoing,
                        },
                    );
                    context_node
                }
            };
            lattice.insert_transition(from, target, transition_in, CombinePolicy::Max)?;
        }

        lattice.remove_node(node)?;
        debug!(node, contexts = cache.len(), looped = post.is_some(), "expanded node");
        Ok(())
    }

    /// Node standing for `w` repeated: loop and exits under the `w w` history
    fn build_post_node(
        &self,
        lattice: &mut Lattice,
        budget: &NodeBudget,
        word: WordId,
        exits: &[Exit],
        loop_flags: TransitionFlags,
    ) -> std::result::Result<NodeIndex, ExpandFailure> {
        let repeated = [word, word];
        let history: &[WordId] = if self.lm.context_length_used(&repeated) >= 2 {
            &repeated
        } else {
            &repeated[..1]
        };

        let post = budget.allocate(lattice, Some(word))?;
        lattice.insert_transition(
            post,
            post,
            Transition::with_flags(self.lm.word_prob(word, history), loop_flags),
            CombinePolicy::Max,
        )?;
        for exit in exits {
            lattice.insert_transition(
                post,
                exit.to,
                Transition::with_flags(exit.rescored(self.lm, history), exit.transition.flags),
                CombinePolicy::Max,
            )?;
        }
        Ok(post)
    }
}

/// Expand a bigram lattice to trigram context
pub fn expand_trigram(
    lattice: &mut Lattice,
    lm: &dyn LanguageModel,
    vocab: &dyn Vocabulary,
    config: &ExpandConfig,
) -> Result<ExpandOutcome> {
    let expander = Expander {
        lm,
        vocab,
        tolerance: config.tolerance,
    };

    expand_on_copy(lattice, config.max_nodes, |work, budget| {
        let initial = work.initial();
        let final_node = work.final_node();
        for node in sort_nodes(work) {
            if node == initial || node == final_node {
                continue;
            }
            // epsilon nodes stay as they are
            let Some(word) = work.word(node).flatten() else {
                continue;
            };
            expander.expand_node(work, budget, node, word)?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::context_expansion::testing::{build, nodes_with, ScoreLm};
    use crate::shared::ports::SymbolTable;

    const A: WordId = 10;
    const B: WordId = 11;
    const C: WordId = 12;
    const D: WordId = 13;

    /// 0 -> {a, b} -> c -> d -> 5
    fn converging() -> Lattice {
        build(
            &[None, Some(A), Some(B), Some(C), Some(D), None],
            &[
                (0, 1, -0.3),
                (0, 2, -0.4),
                (1, 3, -0.5),
                (2, 3, -0.6),
                (3, 4, -0.7),
                (4, 5, -0.8),
            ],
        )
    }

    #[test]
    fn test_converging_paths_split_by_history() {
        let vocab = SymbolTable::new();
        let lm = ScoreLm { order: 3 };
        let mut lat = converging();
        let outcome = expand_trigram(&mut lat, &lm, &vocab, &ExpandConfig::default()).unwrap();
        assert!(outcome.is_completed());

        // c splits by history (a vs b); d is reached only via c and stays single
        assert_eq!(nodes_with(&lat, C).len(), 2);
        assert_eq!(nodes_with(&lat, D).len(), 1);
        assert_eq!(lat.num_nodes(), 7);
        assert!(lat.check_consistency().is_ok());

        let a = nodes_with(&lat, A)[0];
        assert_eq!(lat.find_transition(0, a).unwrap().weight, -0.3);
        let c_after_a = lat.successors(a)[0];
        assert_eq!(
            lat.find_transition(a, c_after_a).unwrap().weight,
            ScoreLm::score(C, &[A, vocab.sentence_start()])
        );
        let d = nodes_with(&lat, D)[0];
        assert_eq!(
            lat.find_transition(c_after_a, d).unwrap().weight,
            ScoreLm::score(D, &[C, A])
        );
        assert_eq!(
            lat.find_transition(d, 5).unwrap().weight,
            ScoreLm::score(vocab.sentence_end(), &[D, C])
        );
    }

    #[test]
    fn test_self_loop_builds_post_node() {
        let vocab = SymbolTable::new();
        let lm = ScoreLm { order: 3 };
        let mut lat = build(&[None, Some(A), None], &[(0, 1, -0.2), (1, 1, -0.5), (1, 2, -0.1)]);
        expand_trigram(&mut lat, &lm, &vocab, &ExpandConfig::default()).unwrap();

        let copies = nodes_with(&lat, A);
        assert_eq!(copies.len(), 2);
        let post = *copies.iter().find(|&&n| lat.self_loop(n).is_some()).unwrap();
        let pre = *copies.iter().find(|&&n| n != post).unwrap();

        assert_eq!(lat.self_loop(post).unwrap().weight, ScoreLm::score(A, &[A, A]));
        assert_eq!(
            lat.find_transition(pre, post).unwrap().weight,
            ScoreLm::score(A, &[A, vocab.sentence_start()])
        );
        assert_eq!(
            lat.find_transition(post, 2).unwrap().weight,
            ScoreLm::score(vocab.sentence_end(), &[A, A])
        );
        assert!(lat.self_loop(pre).is_none());
        assert!(lat.check_consistency().is_ok());
    }

    #[test]
    fn test_bigram_model_falls_back_for_loops() {
        let vocab = SymbolTable::new();
        let lm = ScoreLm { order: 2 };
        let mut lat = build(&[None, Some(A), None], &[(0, 1, -0.2), (1, 1, -0.5), (1, 2, -0.1)]);
        expand_trigram(&mut lat, &lm, &vocab, &ExpandConfig::default()).unwrap();
        let post = nodes_with(&lat, A)
            .into_iter()
            .find(|&n| lat.self_loop(n).is_some())
            .unwrap();
        assert_eq!(lat.self_loop(post).unwrap().weight, ScoreLm::score(A, &[A]));
    }

    #[test]
    fn test_budget_exceeded_leaves_lattice_untouched() {
        let vocab = SymbolTable::new();
        let lm = ScoreLm { order: 3 };
        let mut lat = converging();
        let config = ExpandConfig {
            max_nodes: 6,
            ..ExpandConfig::default()
        };
        let outcome = expand_trigram(&mut lat, &lm, &vocab, &config).unwrap();
        assert_eq!(outcome, ExpandOutcome::BudgetExceeded { limit: 6 });
        assert_eq!(lat.num_nodes(), 6);
        assert_eq!(lat.max_index(), 6);
    }

    #[test]
    fn test_shared_history_reuses_context_node() {
        // two predecessors with the same word feed one context node
        let vocab = SymbolTable::new();
        let lm = ScoreLm { order: 3 };
        let mut lat = build(
            &[None, Some(A), Some(A), Some(B), None],
            &[(0, 1, -0.1), (0, 2, -0.2), (1, 2, -0.3), (1, 3, -0.4), (2, 3, -0.5), (3, 4, 0.0)],
        );
        expand_trigram(&mut lat, &lm, &vocab, &ExpandConfig::default()).unwrap();
        // b is entered after a in every case: one copy
        assert_eq!(nodes_with(&lat, B).len(), 1);
        assert!(lat.check_consistency().is_ok());
    }
}
