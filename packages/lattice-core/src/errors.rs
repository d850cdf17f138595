//! Error types for lattice-core
//!
//! Provides unified error handling across the crate. Only structural and
//! parse failures are errors; algorithmic soft failures (no surviving path,
//! exhausted node budget) are reported through explicit outcome values.

use thiserror::Error;

use crate::config::ConfigError;
use crate::shared::models::NodeIndex;

/// Main error type for lattice operations
#[derive(Debug, Error)]
pub enum LatticeError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed PFSG or ARPA input
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// A node referenced by an operation does not exist
    #[error("Node {0} not found")]
    NodeNotFound(NodeIndex),

    /// Adjacency records disagree (broken graph invariant)
    #[error("Inconsistent transition {from} -> {to}: {reason}")]
    Inconsistent {
        from: NodeIndex,
        to: NodeIndex,
        reason: String,
    },

    /// Weight outside the domain an algorithm can handle
    #[error("Invalid weight: {0}")]
    InvalidWeight(String),

    /// Structural error (missing initial/final node, recursive sub-graphs, ...)
    #[error("Structure error: {0}")]
    Structure(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl LatticeError {
    /// Create a parse error
    pub fn parse(line: usize, msg: impl Into<String>) -> Self {
        LatticeError::Parse {
            line,
            message: msg.into(),
        }
    }

    /// Create a structure error
    pub fn structure(msg: impl Into<String>) -> Self {
        LatticeError::Structure(msg.into())
    }

    /// Create an inconsistency error
    pub fn inconsistent(from: NodeIndex, to: NodeIndex, reason: impl Into<String>) -> Self {
        LatticeError::Inconsistent {
            from,
            to,
            reason: reason.into(),
        }
    }
}

/// Result type alias for lattice operations
pub type Result<T> = std::result::Result<T, LatticeError>;
