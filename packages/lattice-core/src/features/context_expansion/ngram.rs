//! General n-gram context expansion
//!
//! Builds the expanded lattice as a product of the original lattice and the
//! language model's context states: every reachable pair of (original node,
//! history) gets one new node. Histories are kept most-recent-first and
//! truncated to what the model can actually use; the back-off weights of the
//! dropped words are charged on the transition that enters the state, which
//! is exact because every state predicts one next word.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;

use super::{expand_on_copy, history_word, predicted_word, ExpandFailure, ExpandOutcome, NodeBudget};
use crate::config::ExpandConfig;
use crate::errors::{LatticeError, Result};
use crate::features::lattice::Lattice;
use crate::shared::models::{CombinePolicy, NodeIndex, Transition, WordId};
use crate::shared::ports::{LanguageModel, Vocabulary};

type State = (NodeIndex, Vec<WordId>);

/// `history` truncated to the model's usable length, and the back-off weight
/// paid for the truncation
fn fit_history(lm: &dyn LanguageModel, mut history: Vec<WordId>, max_len: usize) -> (Vec<WordId>, f64) {
    history.truncate(max_len);
    let keep = lm.context_length_used(&history).min(history.len());
    let penalty = lm.truncation_weight(&history, keep);
    history.truncate(keep);
    (history, penalty)
}

fn expand_states(
    lattice: &mut Lattice,
    budget: &NodeBudget,
    lm: &dyn LanguageModel,
    vocab: &dyn Vocabulary,
    order: usize,
) -> std::result::Result<(), ExpandFailure> {
    let initial = lattice.initial();
    let final_node = lattice.final_node();
    if !lattice.contains(initial) || !lattice.contains(final_node) {
        return Err(LatticeError::structure("expansion needs an initial and a final node").into());
    }
    let max_history = order.saturating_sub(1);
    let originals = lattice.node_indices();

    let start_history: Vec<WordId> = history_word(lattice, vocab, initial).into_iter().collect();
    let (start_history, _) = fit_history(lm, start_history, max_history);

    let new_initial = budget.allocate(lattice, lattice.word(initial).flatten())?;
    let new_final = budget.allocate(lattice, lattice.word(final_node).flatten())?;
    let final_word = predicted_word(lattice, vocab, final_node);

    let mut states: FxHashMap<State, NodeIndex> = FxHashMap::default();
    let mut queue: VecDeque<(NodeIndex, Vec<WordId>, NodeIndex)> = VecDeque::new();
    states.insert((initial, start_history.clone()), new_initial);
    queue.push_back((initial, start_history, new_initial));

    while let Some((original, history, from)) = queue.pop_front() {
        let mut exits = lattice.out_transitions(original);
        exits.sort_unstable_by_key(|(to, _)| *to);

        for (to, transition) in exits {
            if to == final_node {
                let weight = match final_word {
                    Some(word) => lm.word_prob(word, &history),
                    None => transition.weight,
                };
                lattice.insert_transition(
                    from,
                    new_final,
                    Transition::with_flags(weight, transition.flags),
                    CombinePolicy::Max,
                )?;
                continue;
            }

            let word = lattice.word(to).flatten();
            let (next_history, weight) = match word {
                Some(word) => {
                    let extended: Vec<WordId> = std::iter::once(word).chain(history.iter().copied()).collect();
                    let (fitted, penalty) = fit_history(lm, extended, max_history);
                    (fitted, lm.word_prob(word, &history) + penalty)
                }
                // epsilon nodes pass the history through unchanged
                None => (history.clone(), transition.weight),
            };

            let key = (to, next_history);
            let target = match states.get(&key) {
                Some(&node) => node,
                None => {
                    let node = budget.allocate(lattice, word)?;
                    queue.push_back((to, key.1.clone(), node));
                    states.insert(key, node);
                    node
                }
            };
            lattice.insert_transition(
                from,
                target,
                Transition::with_flags(weight, transition.flags),
                CombinePolicy::Max,
            )?;
        }
    }

    for node in originals {
        lattice.remove_node(node)?;
    }
    lattice.set_initial(new_initial);
    lattice.set_final(new_final);
    Ok(())
}

/// Expand to `config.order` context. Nodes unreachable from the initial
/// node are dropped.
pub fn expand_ngram(
    lattice: &mut Lattice,
    lm: &dyn LanguageModel,
    vocab: &dyn Vocabulary,
    config: &ExpandConfig,
) -> Result<ExpandOutcome> {
    expand_on_copy(lattice, config.max_nodes, |work, budget| {
        expand_states(work, budget, lm, vocab, config.order)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::context_expansion::testing::{build, nodes_with, ScoreLm};
    use crate::features::lattice::sort_nodes;
    use crate::shared::ports::SymbolTable;
    use crate::shared::utils::log_prob::LogP;

    const A: WordId = 10;
    const B: WordId = 11;
    const C: WordId = 12;

    /// 0 -> {a, b} -> c -> 4
    fn diamond() -> Lattice {
        build(
            &[None, Some(A), Some(B), Some(C), None],
            &[(0, 1, -0.1), (0, 2, -0.2), (1, 3, -0.3), (2, 3, -0.4), (3, 4, -0.5)],
        )
    }

    fn config(order: usize) -> ExpandConfig {
        ExpandConfig {
            order,
            ..ExpandConfig::default()
        }
    }

    #[test]
    fn test_bigram_order_rescores_without_splitting() {
        let vocab = SymbolTable::new();
        let mut lat = diamond();
        expand_ngram(&mut lat, &ScoreLm { order: 2 }, &vocab, &config(2)).unwrap();
        assert_eq!(lat.num_nodes(), 5);
        assert_eq!(nodes_with(&lat, C).len(), 1);
        let c = nodes_with(&lat, C)[0];
        let a = nodes_with(&lat, A)[0];
        assert_eq!(lat.find_transition(a, c).unwrap().weight, ScoreLm::score(C, &[A]));
        assert_eq!(
            lat.find_transition(lat.initial(), a).unwrap().weight,
            ScoreLm::score(A, &[vocab.sentence_start()])
        );
    }

    #[test]
    fn test_trigram_order_splits_histories() {
        let vocab = SymbolTable::new();
        let mut lat = diamond();
        let outcome = expand_ngram(&mut lat, &ScoreLm { order: 3 }, &vocab, &config(3)).unwrap();
        assert_eq!(
            outcome,
            ExpandOutcome::Completed {
                nodes_before: 5,
                nodes_after: 6
            }
        );
        assert_eq!(nodes_with(&lat, C).len(), 2);
        for c in nodes_with(&lat, C) {
            let pred = lat.predecessors(c)[0];
            let pred_word = lat.word(pred).flatten().unwrap();
            let expected = ScoreLm::score(vocab.sentence_end(), &[C, pred_word]);
            assert_eq!(lat.find_transition(c, lat.final_node()).unwrap().weight, expected);
        }
        assert_eq!(sort_nodes(&lat).len(), 6);
        assert!(lat.check_consistency().is_ok());
    }

    #[test]
    fn test_self_loop_reaches_fixed_point() {
        let vocab = SymbolTable::new();
        let mut lat = build(&[None, Some(A), None], &[(0, 1, -0.2), (1, 1, -0.5), (1, 2, -0.1)]);
        expand_ngram(&mut lat, &ScoreLm { order: 3 }, &vocab, &config(3)).unwrap();
        // histories: (a <s>) and (a a); the second loops on itself
        let copies = nodes_with(&lat, A);
        assert_eq!(copies.len(), 2);
        let looped = copies.iter().filter(|&&n| lat.self_loop(n).is_some()).count();
        assert_eq!(looped, 1);
    }

    /// Model that can never use more than one word of history and charges a
    /// fixed back-off weight for every longer context
    struct ShortMemory;

    impl LanguageModel for ShortMemory {
        fn order(&self) -> usize {
            3
        }
        fn word_prob(&self, word: WordId, context: &[WordId]) -> LogP {
            ScoreLm::score(word, &context[..context.len().min(1)])
        }
        fn context_length_used(&self, context: &[WordId]) -> usize {
            context.len().min(1)
        }
        fn backoff_weight(&self, context: &[WordId]) -> LogP {
            if context.len() == 2 {
                -0.25
            } else {
                0.0
            }
        }
    }

    #[test]
    fn test_truncation_charges_backoff() {
        let vocab = SymbolTable::new();
        let mut lat = build(&[None, Some(A), Some(B), None], &[(0, 1, 0.0), (1, 2, 0.0), (2, 3, 0.0)]);
        expand_ngram(&mut lat, &ShortMemory, &vocab, &config(3)).unwrap();
        let a = nodes_with(&lat, A)[0];
        let b = nodes_with(&lat, B)[0];
        let expected = ScoreLm::score(B, &[A]) - 0.25;
        assert!((lat.find_transition(a, b).unwrap().weight - expected).abs() < 1e-12);
    }

    #[test]
    fn test_budget() {
        let vocab = SymbolTable::new();
        let mut lat = diamond();
        let mut cfg = config(3);
        cfg.max_nodes = 8;
        let outcome = expand_ngram(&mut lat, &ScoreLm { order: 3 }, &vocab, &cfg).unwrap();
        assert!(!outcome.is_completed());
        assert_eq!(lat.num_nodes(), 5);
    }
}
