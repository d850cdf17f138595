//! Ports to external collaborators
//!
//! The lattice engine only sees words and probabilities through these
//! traits; concrete symbol tables and language models plug in here.

pub mod language_model;
pub mod vocabulary;

pub use language_model::LanguageModel;
pub use vocabulary::{SymbolTable, Vocabulary};
