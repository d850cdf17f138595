/*
 * Lattice Core - Word Lattice Engine
 *
 * Feature-First Architecture:
 * - shared/      : Common models (LatticeNode, Transition), log-prob helpers, ports
 * - features/    : Vertical slices (lattice → posterior → minimization → expansion → pfsg)
 * - config/      : Presets and YAML stage configuration
 * - errors       : Crate-wide error type
 *
 * Lattices are directed graphs of word-labelled nodes with log10 transition
 * weights, built from recognizer output and rescored with n-gram models.
 */

// Crate-level lint configuration
#![allow(clippy::module_inception)] // features::lattice::lattice
#![allow(clippy::new_without_default)] // Default impl not always needed
#![allow(clippy::needless_range_loop)] // Range loop for indexing
#![allow(clippy::type_complexity)] // Queue and state tuples in expansion
#![allow(clippy::should_implement_trait)] // Preset::from_str naming intentional

// ═══════════════════════════════════════════════════════════════════════════
// Module Exports - Feature-First Architecture
// ═══════════════════════════════════════════════════════════════════════════

/// Shared models and utilities
pub mod shared;

/// Feature modules (graph core and lattice algorithms)
pub mod features;

/// Configuration system
pub mod config;

/// Error types
pub mod errors;

// ═══════════════════════════════════════════════════════════════════════════
// Re-exports for Public API
// ═══════════════════════════════════════════════════════════════════════════

pub use config::{LatticeConfig, Preset};
pub use errors::{LatticeError, Result};
pub use features::lattice::{Lattice, LatticeStats};
pub use shared::models::{CombinePolicy, NodeFlags, NodeIndex, NodeLabel, Transition, TransitionFlags, WordId};
pub use shared::ports::{LanguageModel, SymbolTable, Vocabulary};
pub use shared::utils::log_prob::{LogP, LOG_P_ONE, LOG_P_ZERO};
