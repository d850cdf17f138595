//! Posterior computation: forward-backward, pruning and best path

pub mod forward_backward;
pub mod pruning;
pub mod viterbi;

pub use forward_backward::{compute_forward_backward, ForwardBackward};
pub use pruning::{prune_lattice, PruneOutcome};
pub use viterbi::{best_path, BestPath};
