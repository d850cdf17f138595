//! Word lattice graph core
//!
//! Nodes live in an arena indexed by [`NodeIndex`]; a removed node leaves an
//! empty slot so indices are never reused. Every transition `u -> v` is
//! recorded twice, in `u`'s outgoing map and in `v`'s incoming map, with the
//! same weight and flags. All mutation goes through this type so both
//! records stay in sync.

use crate::config::AdjacencyBackend;
use crate::errors::{LatticeError, Result};
use crate::shared::models::{
    CombinePolicy, LatticeNode, NodeFlags, NodeIndex, NodeLabel, Transition, TransitionFlags,
};
use crate::shared::utils::log_prob::{add_log_p, LogP};
use crate::shared::utils::node_map::NodeMap;

/// A weighted word lattice with one initial and one final node
#[derive(Debug, Clone)]
pub struct Lattice {
    name: String,
    nodes: Vec<Option<LatticeNode>>,
    num_nodes: usize,
    initial: NodeIndex,
    final_node: NodeIndex,
    backend: AdjacencyBackend,
}

impl Lattice {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_backend(name, AdjacencyBackend::default())
    }

    pub fn with_backend(name: impl Into<String>, backend: AdjacencyBackend) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            num_nodes: 0,
            initial: 0,
            final_node: 0,
            backend,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn backend(&self) -> AdjacencyBackend {
        self.backend
    }

    pub fn initial(&self) -> NodeIndex {
        self.initial
    }

    pub fn final_node(&self) -> NodeIndex {
        self.final_node
    }

    pub fn set_initial(&mut self, node: NodeIndex) {
        self.initial = node;
    }

    pub fn set_final(&mut self, node: NodeIndex) {
        self.final_node = node;
    }

    /// One past the largest index ever allocated
    pub fn max_index(&self) -> NodeIndex {
        self.nodes.len() as NodeIndex
    }

    /// Advance the index counter so the next allocated node gets `index` or
    /// higher
    pub fn reserve_indices(&mut self, index: NodeIndex) {
        if index as usize > self.nodes.len() {
            self.nodes.resize_with(index as usize, || None);
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    pub fn num_transitions(&self) -> usize {
        self.nodes
            .iter()
            .flatten()
            .map(|node| node.out_transitions.len())
            .sum()
    }

    pub fn contains(&self, index: NodeIndex) -> bool {
        self.node(index).is_some()
    }

    pub fn node(&self, index: NodeIndex) -> Option<&LatticeNode> {
        self.nodes.get(index as usize).and_then(Option::as_ref)
    }

    pub fn node_mut(&mut self, index: NodeIndex) -> Option<&mut LatticeNode> {
        self.nodes.get_mut(index as usize).and_then(Option::as_mut)
    }

    fn node_or_err(&self, index: NodeIndex) -> Result<&LatticeNode> {
        self.node(index).ok_or(LatticeError::NodeNotFound(index))
    }

    fn node_mut_or_err(&mut self, index: NodeIndex) -> Result<&mut LatticeNode> {
        self.node_mut(index).ok_or(LatticeError::NodeNotFound(index))
    }

    /// Word label of a node
    pub fn word(&self, index: NodeIndex) -> Option<NodeLabel> {
        self.node(index).map(|node| node.word)
    }

    pub fn set_word(&mut self, index: NodeIndex, word: NodeLabel) -> Result<()> {
        self.node_mut_or_err(index)?.word = word;
        Ok(())
    }

    /// Indices of all live nodes, ascending
    pub fn node_indices(&self) -> Vec<NodeIndex> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(i, _)| i as NodeIndex)
            .collect()
    }

    // ------------------------------------------------------------------
    // Node mutation
    // ------------------------------------------------------------------

    /// Create node `index` with `word`. Returns false (and relabels the node)
    /// if it already existed.
    pub fn insert_node(&mut self, index: NodeIndex, word: NodeLabel) -> bool {
        if let Some(node) = self.node_mut(index) {
            node.word = word;
            return false;
        }
        self.reserve_indices(index + 1);
        self.nodes[index as usize] = Some(LatticeNode::new(word, self.backend));
        self.num_nodes += 1;
        true
    }

    /// Allocate a fresh node with the given label and flags
    pub fn duplicate_node(&mut self, word: NodeLabel, flags: NodeFlags) -> NodeIndex {
        let index = self.max_index();
        self.insert_node(index, word);
        if let Some(node) = self.node_mut(index) {
            node.flags = flags;
        }
        index
    }

    /// Allocate a fresh node with the given label
    pub fn add_node(&mut self, word: NodeLabel) -> NodeIndex {
        self.duplicate_node(word, NodeFlags::NONE)
    }

    /// Remove a node and every transition touching it.
    ///
    /// Fails without mutating anything if a neighbor lacks the mirror record
    /// of one of the node's transitions.
    pub fn remove_node(&mut self, index: NodeIndex) -> Result<()> {
        let node = self.node_or_err(index)?;
        let outgoing = node.out_transitions.keys();
        let incoming = node.in_transitions.keys();

        for &to in &outgoing {
            let mirrored = self
                .node(to)
                .map(|n| n.in_transitions.contains(index))
                .unwrap_or(false);
            if !mirrored {
                return Err(LatticeError::inconsistent(
                    index,
                    to,
                    "destination has no incoming record",
                ));
            }
        }
        for &from in &incoming {
            let mirrored = self
                .node(from)
                .map(|n| n.out_transitions.contains(index))
                .unwrap_or(false);
            if !mirrored {
                return Err(LatticeError::inconsistent(
                    from,
                    index,
                    "source has no outgoing record",
                ));
            }
        }

        for to in outgoing {
            if to != index {
                if let Some(n) = self.node_mut(to) {
                    n.in_transitions.remove(index);
                }
            }
        }
        for from in incoming {
            if from != index {
                if let Some(n) = self.node_mut(from) {
                    n.out_transitions.remove(index);
                }
            }
        }

        self.nodes[index as usize] = None;
        self.num_nodes -= 1;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    pub fn find_transition(&self, from: NodeIndex, to: NodeIndex) -> Option<&Transition> {
        self.node(from).and_then(|n| n.out_transitions.find(to))
    }

    /// Insert `from -> to`, combining with an existing transition under
    /// `policy`. Returns true if the transition is new.
    pub fn insert_transition(
        &mut self,
        from: NodeIndex,
        to: NodeIndex,
        transition: Transition,
        policy: CombinePolicy,
    ) -> Result<bool> {
        self.node_or_err(to)?;
        let existing = self.node_or_err(from)?.out_transitions.find(to).copied();

        let combined = match existing {
            None => transition,
            Some(old) => Transition {
                weight: combine_weights(old.weight, transition.weight, policy),
                flags: TransitionFlags::combine(old.flags, transition.flags),
            },
        };

        self.node_mut_or_err(from)?
            .out_transitions
            .insert(to, combined);
        self.node_mut_or_err(to)?.in_transitions.insert(from, combined);
        Ok(existing.is_none())
    }

    /// Remove `from -> to` from both adjacency records
    pub fn remove_transition(&mut self, from: NodeIndex, to: NodeIndex) -> Result<Option<Transition>> {
        let out = self.node_mut_or_err(from)?.out_transitions.remove(to);
        let inc = self.node_mut_or_err(to)?.in_transitions.remove(from);
        match (out, inc) {
            (None, None) => Ok(None),
            (Some(t), Some(_)) => Ok(Some(t)),
            _ => Err(LatticeError::inconsistent(
                from,
                to,
                "transition recorded on one side only",
            )),
        }
    }

    fn update_transition(
        &mut self,
        from: NodeIndex,
        to: NodeIndex,
        update: impl Fn(&mut Transition),
    ) -> Result<()> {
        let missing = || LatticeError::inconsistent(from, to, "no such transition");
        update(
            self.node_mut_or_err(from)?
                .out_transitions
                .find_mut(to)
                .ok_or_else(missing)?,
        );
        update(
            self.node_mut_or_err(to)?
                .in_transitions
                .find_mut(from)
                .ok_or_else(missing)?,
        );
        Ok(())
    }

    pub fn set_transition_weight(&mut self, from: NodeIndex, to: NodeIndex, weight: LogP) -> Result<()> {
        self.update_transition(from, to, |t| t.weight = weight)
    }

    pub fn mark_transition(&mut self, from: NodeIndex, to: NodeIndex, flags: TransitionFlags) -> Result<()> {
        self.update_transition(from, to, |t| t.flags.insert(flags))
    }

    pub fn unmark_transition(&mut self, from: NodeIndex, to: NodeIndex, flags: TransitionFlags) -> Result<()> {
        self.update_transition(from, to, |t| t.flags.remove(flags))
    }

    /// Snapshot of a node's outgoing transitions
    pub fn out_transitions(&self, index: NodeIndex) -> Vec<(NodeIndex, Transition)> {
        self.node(index)
            .map(|n| n.out_transitions.entries())
            .unwrap_or_default()
    }

    /// Snapshot of a node's incoming transitions
    pub fn in_transitions(&self, index: NodeIndex) -> Vec<(NodeIndex, Transition)> {
        self.node(index)
            .map(|n| n.in_transitions.entries())
            .unwrap_or_default()
    }

    pub fn successors(&self, index: NodeIndex) -> Vec<NodeIndex> {
        self.node(index)
            .map(|n| n.out_transitions.keys())
            .unwrap_or_default()
    }

    pub fn predecessors(&self, index: NodeIndex) -> Vec<NodeIndex> {
        self.node(index)
            .map(|n| n.in_transitions.keys())
            .unwrap_or_default()
    }

    pub fn self_loop(&self, index: NodeIndex) -> Option<Transition> {
        self.find_transition(index, index).copied()
    }

    /// Fold node `drop` into node `keep`: every transition of `drop` is
    /// re-inserted on `keep` under `policy`, then `drop` is removed.
    pub fn merge_nodes(&mut self, keep: NodeIndex, drop: NodeIndex, policy: CombinePolicy) -> Result<()> {
        if keep == drop {
            return Ok(());
        }
        self.node_or_err(keep)?;

        for (to, transition) in self.out_transitions(drop) {
            let to = if to == drop { keep } else { to };
            self.insert_transition(keep, to, transition, policy)?;
        }
        for (from, transition) in self.in_transitions(drop) {
            if from == drop {
                continue;
            }
            self.insert_transition(from, keep, transition, policy)?;
        }
        self.remove_node(drop)
    }

    // ------------------------------------------------------------------
    // Node flags
    // ------------------------------------------------------------------

    pub fn mark_node(&mut self, index: NodeIndex, flags: NodeFlags) {
        if let Some(node) = self.node_mut(index) {
            node.flags.insert(flags);
        }
    }

    pub fn node_has_flags(&self, index: NodeIndex, flags: NodeFlags) -> bool {
        self.node(index)
            .map(|n| n.flags.contains(flags))
            .unwrap_or(false)
    }

    /// Clear `flags` on every node
    pub fn clear_node_flags(&mut self, flags: NodeFlags) {
        for node in self.nodes.iter_mut().flatten() {
            node.flags.remove(flags);
        }
    }

    // ------------------------------------------------------------------
    // Invariants
    // ------------------------------------------------------------------

    /// Verify that initial/final exist and that every transition is recorded
    /// identically on both endpoints
    pub fn check_consistency(&self) -> Result<()> {
        if !self.contains(self.initial) {
            return Err(LatticeError::structure(format!(
                "initial node {} does not exist",
                self.initial
            )));
        }
        if !self.contains(self.final_node) {
            return Err(LatticeError::structure(format!(
                "final node {} does not exist",
                self.final_node
            )));
        }

        for index in self.node_indices() {
            for (to, transition) in self.out_transitions(index) {
                let mirror = self
                    .node(to)
                    .ok_or_else(|| LatticeError::inconsistent(index, to, "destination missing"))?
                    .in_transitions
                    .find(index);
                if !matches!(mirror, Some(m) if same_transition(m, &transition)) {
                    return Err(LatticeError::inconsistent(
                        index,
                        to,
                        "incoming record missing or different",
                    ));
                }
            }
            for (from, transition) in self.in_transitions(index) {
                let mirror = self
                    .node(from)
                    .ok_or_else(|| LatticeError::inconsistent(from, index, "source missing"))?
                    .out_transitions
                    .find(index);
                if !matches!(mirror, Some(m) if same_transition(m, &transition)) {
                    return Err(LatticeError::inconsistent(
                        from,
                        index,
                        "outgoing record missing or different",
                    ));
                }
            }
        }
        Ok(())
    }
}

fn same_transition(a: &Transition, b: &Transition) -> bool {
    a.flags == b.flags && (a.weight == b.weight || (a.weight.is_nan() && b.weight.is_nan()))
}

/// Combine two weights of parallel transitions
pub fn combine_weights(a: LogP, b: LogP, policy: CombinePolicy) -> LogP {
    match policy {
        CombinePolicy::Max => a.max(b),
        CombinePolicy::LogAdd => add_log_p(a, b),
    }
}
