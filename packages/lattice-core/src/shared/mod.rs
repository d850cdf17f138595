//! Shared module - Common types and utilities
//!
//! This module contains types that are shared across all features:
//! lattice node/transition models, log-probability helpers, the node map
//! abstraction and the ports to external collaborators (vocabulary,
//! language model).

pub mod constants;
pub mod models;
pub mod ports;
pub mod utils;

// Re-exports for convenience
pub use models::*;
pub use utils::log_prob::{LogP, LOG_P_ONE, LOG_P_ZERO};
