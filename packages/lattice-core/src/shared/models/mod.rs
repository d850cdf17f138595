//! Shared models

mod node;
mod transition;

pub use node::{LatticeNode, NodeFlags, NodeIndex, NodeLabel, WordId};
pub use transition::{CombinePolicy, Transition, TransitionFlags};
