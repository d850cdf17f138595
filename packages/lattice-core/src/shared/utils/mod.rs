//! Utility modules shared across features
//!
//! - `log_prob`: log-domain probability arithmetic and intlog conversion
//! - `node_map`: node-keyed map abstraction with hashed and sorted backends

pub mod log_prob;
pub mod node_map;

pub use log_prob::{add_log_p, LogP, LOG_P_ONE, LOG_P_ZERO};
pub use node_map::{AdjacencyMap, HashedNodeMap, NodeMap, SortedNodeMap};
