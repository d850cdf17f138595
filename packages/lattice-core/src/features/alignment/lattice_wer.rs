//! Lattice word error: minimum edit distance between a reference word string
//! and any path through the lattice
//!
//! The chart has one row per consumed reference symbol (the reference plus
//! an implicit sentence end) and one column per reachable node. Moving along
//! a transition without consuming a reference word is an insertion; staying
//! on a node while consuming one is a deletion; moving while consuming one is
//! a match or substitution. Epsilon and non-event nodes are inserted for
//! free and never consume reference words, except that the sentence-end
//! label of the final node matches the implicit reference end.

use serde::Serialize;
use tracing::warn;

use crate::config::AlignmentCosts;
use crate::features::lattice::{order_positions, sort_nodes, Lattice};
use crate::shared::models::{NodeIndex, WordId};
use crate::shared::ports::Vocabulary;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WordErrors {
    pub substitutions: usize,
    pub insertions: usize,
    pub deletions: usize,
}

impl WordErrors {
    pub fn total(&self) -> usize {
        self.substitutions + self.insertions + self.deletions
    }

    /// Errors per reference word (0 for an empty reference)
    pub fn rate(&self, reference_len: usize) -> f64 {
        if reference_len == 0 {
            0.0
        } else {
            self.total() as f64 / reference_len as f64
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Cell {
    cost: u32,
    errors: WordErrors,
}

impl Cell {
    fn step(self, cost: u32, update: impl FnOnce(&mut WordErrors)) -> Cell {
        let mut errors = self.errors;
        update(&mut errors);
        Cell {
            cost: self.cost + cost,
            errors,
        }
    }
}

fn relax(slot: &mut Option<Cell>, candidate: Cell) {
    if slot.map_or(true, |cell| candidate.cost < cell.cost) {
        *slot = Some(candidate);
    }
}

/// How a node takes part in the alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeRole {
    /// Real word: inserted at a cost, matches or substitutes reference words
    Word(WordId),
    /// Epsilon or non-event: free to insert, matches only itself
    Silent(Option<WordId>),
}

fn node_role(lattice: &Lattice, vocab: &dyn Vocabulary, node: NodeIndex) -> NodeRole {
    let word = match lattice.word(node).flatten() {
        None if node == lattice.final_node() => Some(vocab.sentence_end()),
        other => other,
    };
    match word {
        Some(w) if !vocab.is_non_event(w) => NodeRole::Word(w),
        other => NodeRole::Silent(other),
    }
}

struct Chart<'a> {
    lattice: &'a Lattice,
    order: Vec<NodeIndex>,
    positions: Vec<Option<usize>>,
    roles: Vec<NodeRole>,
    costs: AlignmentCosts,
}

impl Chart<'_> {
    fn successors(&self, pos: usize) -> Vec<usize> {
        let node = self.order[pos];
        self.lattice
            .successors(node)
            .into_iter()
            .filter(|&next| next != node)
            .filter_map(|next| self.positions.get(next as usize).copied().flatten())
            .collect()
    }

    /// Propagate insertion chains within one row, in topological order
    fn insertions(&self, row: &mut [Option<Cell>]) {
        for pos in 0..self.order.len() {
            let Some(cell) = row[pos] else { continue };
            for next in self.successors(pos) {
                let candidate = match self.roles[next] {
                    NodeRole::Word(_) => cell.step(self.costs.insertion, |e| e.insertions += 1),
                    NodeRole::Silent(_) => cell,
                };
                relax(&mut row[next], candidate);
            }
        }
    }

    /// Consume `symbol`: deletions in place, then matches and substitutions
    /// along transitions, then insertion chains
    fn consume(&self, previous: &[Option<Cell>], symbol: WordId, boundary: bool) -> Vec<Option<Cell>> {
        let mut row: Vec<Option<Cell>> = vec![None; self.order.len()];

        for (pos, cell) in previous.iter().enumerate() {
            let Some(cell) = *cell else { continue };
            let deleted = if boundary {
                cell
            } else {
                cell.step(self.costs.deletion, |e| e.deletions += 1)
            };
            relax(&mut row[pos], deleted);
        }

        for (pos, cell) in previous.iter().enumerate() {
            let Some(cell) = *cell else { continue };
            for next in self.successors(pos) {
                let candidate = match self.roles[next] {
                    NodeRole::Word(w) if w == symbol => cell,
                    NodeRole::Word(_) if !boundary => {
                        cell.step(self.costs.substitution, |e| e.substitutions += 1)
                    }
                    NodeRole::Silent(Some(w)) if w == symbol => cell,
                    _ => continue,
                };
                relax(&mut row[next], candidate);
            }
        }

        self.insertions(&mut row);
        row
    }
}

/// Minimum word errors of any lattice path against `reference`
///
/// When no path reaches the final node every reference word counts as
/// deleted.
pub fn lattice_errors(
    lattice: &Lattice,
    vocab: &dyn Vocabulary,
    reference: &[WordId],
    costs: &AlignmentCosts,
) -> WordErrors {
    let all_deleted = WordErrors {
        deletions: reference.len(),
        ..WordErrors::default()
    };

    let order = sort_nodes(lattice);
    if order.first() != Some(&lattice.initial()) {
        warn!(lattice = lattice.name(), "no initial node, counting reference as deleted");
        return all_deleted;
    }
    let positions = order_positions(lattice, &order);
    let roles = order
        .iter()
        .map(|&node| node_role(lattice, vocab, node))
        .collect();
    let chart = Chart {
        lattice,
        order,
        positions,
        roles,
        costs: *costs,
    };

    let mut row: Vec<Option<Cell>> = vec![None; chart.order.len()];
    row[0] = Some(Cell {
        cost: 0,
        errors: WordErrors::default(),
    });
    chart.insertions(&mut row);

    for &word in reference {
        row = chart.consume(&row, word, false);
    }
    row = chart.consume(&row, vocab.sentence_end(), true);

    let final_cell = chart
        .positions
        .get(lattice.final_node() as usize)
        .copied()
        .flatten()
        .and_then(|pos| row[pos]);

    match final_cell {
        Some(cell) => cell.errors,
        None => {
            warn!(lattice = lattice.name(), "final node unreachable, counting reference as deleted");
            all_deleted
        }
    }
}
