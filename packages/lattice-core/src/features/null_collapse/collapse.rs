//! Elimination of epsilon and pause nodes
//!
//! Every in/out transition pair of a skipped node is spliced into one
//! transition whose weight is the product of the two, times the node's
//! self-loop closure `1 / (1 - p_loop)`. The node is removed afterwards.

use tracing::debug;

use crate::errors::{LatticeError, Result};
use crate::features::lattice::Lattice;
use crate::shared::models::{CombinePolicy, NodeIndex, NodeLabel, Transition, TransitionFlags, WordId};
use crate::shared::utils::log_prob::{loop_closure, LogP, LOG_P_ONE};

/// Which nodes are skipped, and how spliced transitions are flagged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipKind {
    /// Epsilon (NULL) nodes
    Null,
    /// Nodes labeled with the pause word; spliced transitions are marked
    /// as having absorbed a pause
    Pause(WordId),
}

impl SkipKind {
    fn label(self) -> NodeLabel {
        match self {
            SkipKind::Null => None,
            SkipKind::Pause(word) => Some(word),
        }
    }

    /// Flags of the transition spliced from `incoming` and `outgoing`
    pub fn spliced_flags(self, incoming: TransitionFlags, outgoing: TransitionFlags) -> TransitionFlags {
        match self {
            SkipKind::Pause(_) => {
                let mut flags = TransitionFlags::PAUSE;
                if incoming.contains(TransitionFlags::DIRECT) && outgoing.contains(TransitionFlags::DIRECT) {
                    flags.insert(TransitionFlags::DIRECT);
                }
                flags
            }
            SkipKind::Null => {
                let mut flags = (incoming | outgoing).without(TransitionFlags::DIRECT);
                if flags.contains(TransitionFlags::PAUSE) && incoming.is_direct() && outgoing.is_direct() {
                    flags.insert(TransitionFlags::DIRECT);
                }
                flags
            }
        }
    }
}

/// Self-loop closure factor of `node`; `LOG_P_ONE` without a self-loop
pub fn node_closure(lattice: &Lattice, node: NodeIndex) -> Result<LogP> {
    match lattice.self_loop(node) {
        None => Ok(LOG_P_ONE),
        Some(t) => loop_closure(t.weight).ok_or_else(|| {
            LatticeError::InvalidWeight(format!(
                "self-loop on node {} has weight {} (probability >= 1)",
                node, t.weight
            ))
        }),
    }
}

/// Splice out one node. Returns the number of transitions written.
pub fn collapse_node(
    lattice: &mut Lattice,
    node: NodeIndex,
    kind: SkipKind,
    policy: CombinePolicy,
) -> Result<usize> {
    let closure = node_closure(lattice, node)?;
    let incoming: Vec<_> = lattice
        .in_transitions(node)
        .into_iter()
        .filter(|(from, _)| *from != node)
        .collect();
    let outgoing: Vec<_> = lattice
        .out_transitions(node)
        .into_iter()
        .filter(|(to, _)| *to != node)
        .collect();

    let mut written = 0;
    for (from, t_in) in &incoming {
        for (to, t_out) in &outgoing {
            let spliced = Transition::with_flags(
                t_in.weight + t_out.weight + closure,
                kind.spliced_flags(t_in.flags, t_out.flags),
            );
            lattice.insert_transition(*from, *to, spliced, policy)?;
            written += 1;
        }
    }
    lattice.remove_node(node)?;
    Ok(written)
}

/// Remove every non-terminal node matching `kind`. Returns how many nodes
/// were removed.
pub fn collapse_nodes(lattice: &mut Lattice, kind: SkipKind, policy: CombinePolicy) -> Result<usize> {
    let label = kind.label();
    let initial = lattice.initial();
    let final_node = lattice.final_node();
    let targets: Vec<_> = lattice
        .node_indices()
        .into_iter()
        .filter(|&n| n != initial && n != final_node && lattice.word(n) == Some(label))
        .collect();

    let mut transitions = 0;
    for &node in &targets {
        transitions += collapse_node(lattice, node, kind, policy)?;
    }
    debug!(
        lattice = lattice.name(),
        ?kind,
        removed = targets.len(),
        transitions,
        "collapsed skip nodes"
    );
    Ok(targets.len())
}

/// Remove epsilon nodes, summing parallel paths
pub fn remove_null_nodes(lattice: &mut Lattice) -> Result<usize> {
    collapse_nodes(lattice, SkipKind::Null, CombinePolicy::LogAdd)
}

/// Remove pause nodes, flagging the transitions that absorbed them
pub fn collapse_pauses(lattice: &mut Lattice, pause: WordId) -> Result<usize> {
    collapse_nodes(lattice, SkipKind::Pause(pause), CombinePolicy::LogAdd)
}
