//! Lattice nodes

use crate::config::AdjacencyBackend;
use crate::shared::models::Transition;
use crate::shared::utils::log_prob::{LogP, LOG_P_ZERO};
use crate::shared::utils::node_map::AdjacencyMap;

/// Node identifier. Assigned monotonically, never reused within a lattice.
pub type NodeIndex = u32;

/// Vocabulary symbol identifier
pub type WordId = u32;

/// Word carried by a node; `None` is the epsilon (NULL) label
pub type NodeLabel = Option<WordId>;

/// Per-node bookkeeping marks used by traversals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NodeFlags(pub u8);

impl NodeFlags {
    pub const NONE: Self = Self(0);
    /// Reached by the current traversal
    pub const VISITED: Self = Self(1);
    /// Already handled by the current pass
    pub const MARKED: Self = Self(2);
    /// Created by the current pass (context expansion)
    pub const EXPANDED: Self = Self(4);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

/// A lattice node and both directions of its adjacency
#[derive(Debug, Clone)]
pub struct LatticeNode {
    pub word: NodeLabel,
    pub flags: NodeFlags,
    /// Unnormalized log posterior; only meaningful right after forward-backward
    pub posterior: LogP,
    pub(crate) out_transitions: AdjacencyMap<Transition>,
    pub(crate) in_transitions: AdjacencyMap<Transition>,
}

impl LatticeNode {
    pub fn new(word: NodeLabel, backend: AdjacencyBackend) -> Self {
        Self {
            word,
            flags: NodeFlags::NONE,
            posterior: LOG_P_ZERO,
            out_transitions: AdjacencyMap::with_backend(backend),
            in_transitions: AdjacencyMap::with_backend(backend),
        }
    }

    pub fn out_transitions(&self) -> &AdjacencyMap<Transition> {
        &self.out_transitions
    }

    pub fn in_transitions(&self) -> &AdjacencyMap<Transition> {
        &self.in_transitions
    }

    pub fn is_null(&self) -> bool {
        self.word.is_none()
    }
}
