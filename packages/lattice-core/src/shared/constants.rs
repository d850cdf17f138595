//! Centralized lattice constants
//!
//! All fixed numeric conventions of the lattice engine live here:
//! - Intlog scaling used by the PFSG text format
//! - Alignment costs for lattice word-error scoring
//! - Tolerances used when comparing log-probabilities

/// Integer log-probability scaling (PFSG "intlog" weights)
pub mod intlog {
    /// Scale applied to natural-log probabilities: `intlog = round(ln(p) * SCALE)`
    pub const SCALE: f64 = 10000.5;

    /// Smallest intlog written to a PFSG file (zero probability is clamped here)
    pub const MIN_INTLOG: i64 = -250_000;
}

/// Lattice word-error alignment costs
pub mod alignment {
    /// Cost of substituting a reference word with a different lattice word
    pub const SUBSTITUTION_COST: u32 = 4;

    /// Cost of a lattice word with no reference counterpart
    pub const INSERTION_COST: u32 = 3;

    /// Cost of a reference word with no lattice counterpart
    pub const DELETION_COST: u32 = 3;
}

/// Context expansion defaults
pub mod expansion {
    /// Maximum log10 difference under which a cached context node is reused
    pub const WEIGHT_TOLERANCE: f64 = 1e-5;

    /// Default n-gram order of the expanded lattice
    pub const DEFAULT_ORDER: usize = 3;

    /// Highest n-gram order supported by the general expander
    pub const MAX_ORDER: usize = 9;
}

/// Minimization defaults
pub mod merge {
    /// Overlap ratio used by the thorough preset for approximate merging
    pub const THOROUGH_OVERLAP_RATIO: f64 = 0.9;
}

/// Pause handling defaults
pub mod pause {
    /// Conventional pause word in recognizer lattices
    pub const DEFAULT_PAUSE_WORD: &str = "-pau-";

    /// Self-loop probability given to recovered pause nodes
    pub const DEFAULT_LOOP_PROB: f64 = 0.5;
}
