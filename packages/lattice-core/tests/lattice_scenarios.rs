//! End-to-end lattice scenarios
//!
//! Each test reads or builds a small lattice and checks one algorithm's
//! observable result: pruning, pause collapse, self-loop closure, word error.

mod common;

use common::*;
use pretty_assertions::assert_eq;

use lattice_core::config::{AdjacencyBackend, AlignmentCosts, PosteriorConfig, PosteriorNormalization, PruneConfig};
use lattice_core::features::alignment::{lattice_errors, WordErrors};
use lattice_core::features::null_collapse::{collapse_pauses, node_closure};
use lattice_core::features::pfsg::read_pfsg;
use lattice_core::features::posterior::{compute_forward_backward, prune_lattice, PruneOutcome};
use lattice_core::shared::models::TransitionFlags;
use lattice_core::shared::ports::{SymbolTable, Vocabulary};
use lattice_core::shared::utils::log_prob::{log_p_to_intlog, log_p_to_prob};

fn prune_config(threshold: f64, normalization: PosteriorNormalization) -> PruneConfig {
    PruneConfig {
        threshold,
        normalization,
        ..PruneConfig::default()
    }
}

// ============================================================================
// Posterior pruning
// ============================================================================

#[test]
fn test_pruning_removes_weaker_alternative() {
    let mut vocab = SymbolTable::new();
    let mut lat = read_pfsg(TWO_ALTERNATIVES, &mut vocab, AdjacencyBackend::Hashed).unwrap();

    // A carries about 54% of the mass, B about 46%
    let outcome = prune_lattice(
        &mut lat,
        &prune_config(0.5, PosteriorNormalization::Total),
        &PosteriorConfig::default(),
    )
    .unwrap();

    assert_eq!(outcome.removed(), 1);
    assert_eq!(node_words(&lat, &vocab), vec!["A"]);
    assert_consistent(&lat);
}

#[test]
fn test_bottleneck_normalization_keeps_close_alternative() {
    let mut vocab = SymbolTable::new();
    let mut lat = read_pfsg(TWO_ALTERNATIVES, &mut vocab, AdjacencyBackend::Hashed).unwrap();

    // relative to the best path B still has about 86% of its posterior
    let outcome = prune_lattice(
        &mut lat,
        &prune_config(0.5, PosteriorNormalization::MaxMin),
        &PosteriorConfig::default(),
    )
    .unwrap();

    assert_eq!(outcome.removed(), 0);
    assert_eq!(node_words(&lat, &vocab), vec!["A", "B"]);
}

#[test]
fn test_pruning_without_paths_is_reported() {
    let mut vocab = SymbolTable::new();
    let text = "name cut\nnodes 3 NULL A NULL\ninitial 0\nfinal 2\ntransitions 1\n0 1 0\n";
    let mut lat = read_pfsg(text, &mut vocab, AdjacencyBackend::Sorted).unwrap();
    let outcome = prune_lattice(
        &mut lat,
        &prune_config(0.5, PosteriorNormalization::MaxMin),
        &PosteriorConfig::default(),
    )
    .unwrap();
    assert_eq!(outcome, PruneOutcome::NoPaths);
    assert_eq!(lat.num_nodes(), 3);
}

// ============================================================================
// Pause collapse
// ============================================================================

#[test]
fn test_pause_collapse_joins_weights() {
    let mut vocab = SymbolTable::new();
    let pause = vocab.add_non_event("-pau-");
    let mut lat = read_pfsg(PAUSE_BETWEEN_WORDS, &mut vocab, AdjacencyBackend::Hashed).unwrap();

    let removed = collapse_pauses(&mut lat, pause).unwrap();

    assert_eq!(removed, 1);
    assert!(!lat.contains(2));
    let joined = lat.find_transition(1, 3).expect("pause bypass transition");
    assert_eq!(log_p_to_intlog(joined.weight), -150);
    assert!(joined.flags.contains(TransitionFlags::PAUSE));
    assert_eq!(lat.num_transitions(), 3);
    assert_consistent(&lat);
}

// ============================================================================
// Self-loop closure
// ============================================================================

#[test]
fn test_self_loop_doubles_mass_through_node() {
    let mut vocab = SymbolTable::new();
    let build = |vocab: &mut SymbolTable, with_loop: bool| {
        let mut builder = LatticeBuilder::new("loop");
        let start = builder.node(vocab, "NULL");
        let a = builder.node(vocab, "A");
        let end = builder.node(vocab, "NULL");
        builder.edge_prob(start, a, 1.0).edge_prob(a, end, 0.5);
        if with_loop {
            builder.edge_prob(a, a, 0.5);
        }
        builder.build(start, end)
    };

    let mut plain = build(&mut vocab, false);
    let mut looped = build(&mut vocab, true);

    let closure = node_closure(&looped, 1).unwrap();
    assert!((log_p_to_prob(closure) - 2.0).abs() < 1e-9);

    let plain_total = compute_forward_backward(&mut plain, 1.0).total;
    let looped_total = compute_forward_backward(&mut looped, 1.0).total;
    assert!((log_p_to_prob(looped_total - plain_total) - 2.0).abs() < 1e-9);
}

// ============================================================================
// Word error scoring
// ============================================================================

#[test]
fn test_single_substitution_against_reference() {
    let mut vocab = SymbolTable::new();
    let lat = chain("hyp", &mut vocab, "A C");
    let reference = vocab.encode("A B");

    let errors = lattice_errors(&lat, &vocab, &reference, &AlignmentCosts::default());

    assert_eq!(
        errors,
        WordErrors {
            substitutions: 1,
            insertions: 0,
            deletions: 0
        }
    );
    assert!((errors.rate(reference.len()) - 0.5).abs() < 1e-12);
}

#[test]
fn test_best_alternative_is_scored() {
    let mut vocab = SymbolTable::new();
    let mut builder = LatticeBuilder::new("alts");
    let start = builder.node(&mut vocab, "NULL");
    let a = builder.node(&mut vocab, "A");
    let x = builder.node(&mut vocab, "X");
    let b = builder.node(&mut vocab, "B");
    let end = builder.node(&mut vocab, "NULL");
    builder
        .edge_prob(start, a, 0.4)
        .edge_prob(start, x, 0.6)
        .edge_prob(a, b, 1.0)
        .edge_prob(x, b, 1.0)
        .edge_prob(b, end, 1.0);
    let lat = builder.build(start, end);
    let reference = vocab.encode("A B");

    let errors = lattice_errors(&lat, &vocab, &reference, &AlignmentCosts::default());
    assert_eq!(errors.total(), 0);
    // the oracle path need not be the best-scoring one
    assert_eq!(best_words(&lat, &vocab), vec!["X", "B"]);
}
