//! Epsilon/pause node elimination and pause recovery

pub mod collapse;
pub mod recover;

pub use collapse::{collapse_node, collapse_nodes, collapse_pauses, node_closure, remove_null_nodes, SkipKind};
pub use recover::{recover_pauses, PauseRecovery};
