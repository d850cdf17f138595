//! N-gram language models

pub mod arpa;

pub use arpa::ArpaModel;
