//! Feature modules - one vertical slice per lattice algorithm
//!
//! - lattice/           : Graph core, topological sort, statistics
//! - posterior/         : Forward-backward, pruning, best path
//! - minimization/      : Exact and approximate node merging
//! - null_collapse/     : Epsilon and pause removal, pause recovery
//! - context_expansion/ : Trigram and general n-gram expansion
//! - alignment/         : Lattice word error against a reference
//! - algebra/           : Implant, concatenation, union
//! - pfsg/              : PFSG reader and writers, posterior dump
//! - ngram_lm/          : ARPA back-off language model

pub mod lattice;

pub mod posterior;

pub mod minimization;

pub mod null_collapse;

pub mod context_expansion;

pub mod alignment;

pub mod algebra;

pub mod pfsg;

pub mod ngram_lm;
