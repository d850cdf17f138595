//! Lattice graph core
//!
//! - `lattice`: node arena, transitions, structural mutation, consistency check
//! - `topo_sort`: stack-based topological ordering
//! - `stats`: size statistics

pub mod lattice;
pub mod stats;
pub mod topo_sort;

pub use lattice::{combine_weights, Lattice};
pub use stats::LatticeStats;
pub use topo_sort::{order_positions, sort_nodes, sort_nodes_directed, sort_nodes_reverse, Direction};
