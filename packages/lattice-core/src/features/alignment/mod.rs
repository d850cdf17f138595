//! Scoring lattices against reference transcripts

pub mod lattice_wer;

pub use lattice_wer::{lattice_errors, WordErrors};
