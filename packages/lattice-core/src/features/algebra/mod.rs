//! Lattice algebra: implantation, concatenation and union

pub mod compose;
pub mod implant;

pub use compose::{concatenate, union};
pub use implant::implant;
