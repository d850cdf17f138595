//! PFSG text format
//!
//! - `reader`: graphs with nested sub-graph references
//! - `writer`: plain and compact (renumbered) writers
//! - `posteriors`: node and transition posterior dump

pub mod posteriors;
pub mod reader;
pub mod writer;

pub use posteriors::write_posteriors;
pub use reader::{parse_graphs, read_pfsg, read_pfsg_file};
pub use writer::{pfsg_to_string, write_pfsg, write_pfsg_compact, write_pfsg_file};
