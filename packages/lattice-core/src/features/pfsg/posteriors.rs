//! Posterior dump
//!
//! ```text
//! version 2
//! initial <i>
//! final <f>
//! node <id> <label> -1 <posterior> <succ> <prob> <succ> <prob> ...
//! ```
//!
//! Node and transition posteriors are probabilities normalized by the total
//! lattice mass.

use std::io::Write;

use tracing::warn;

use crate::errors::Result;
use crate::features::lattice::Lattice;
use crate::features::posterior::compute_forward_backward;
use crate::shared::ports::Vocabulary;
use crate::shared::utils::log_prob::log_p_to_prob;

pub fn write_posteriors<W: Write>(
    lattice: &mut Lattice,
    vocab: &dyn Vocabulary,
    posterior_scale: f64,
    out: &mut W,
) -> Result<()> {
    let fb = compute_forward_backward(lattice, posterior_scale);
    let has_paths = fb.has_paths();
    if !has_paths {
        warn!(lattice = lattice.name(), "no complete path, writing zero posteriors");
    }
    let normalize = |log_p: f64| {
        if has_paths {
            log_p_to_prob(log_p - fb.total)
        } else {
            0.0
        }
    };

    writeln!(out, "version 2")?;
    writeln!(out, "initial {}", lattice.initial())?;
    writeln!(out, "final {}", lattice.final_node())?;

    for node in lattice.node_indices() {
        let label = vocab.label_to_string(lattice.word(node).flatten());
        write!(out, "node {} {} -1 {}", node, label, normalize(fb.node_posterior(node)))?;
        let mut successors = lattice.out_transitions(node);
        successors.sort_unstable_by_key(|(to, _)| *to);
        for (to, transition) in successors {
            let prob = normalize(fb.transition_posterior(node, to, transition.weight));
            write!(out, " {} {}", to, prob)?;
        }
        writeln!(out)?;
    }
    Ok(())
}
