//! Posterior-threshold pruning
//!
//! Each round runs forward-backward, then removes every node whose posterior,
//! normalized by the reference mass, falls below the threshold. Rounds repeat
//! until nothing changes, the lattice would become empty, or the round limit
//! is hit. Initial and final nodes are never removed.

use tracing::{debug, warn};

use super::forward_backward::compute_forward_backward;
use crate::config::{PosteriorConfig, PosteriorNormalization, PruneConfig};
use crate::errors::Result;
use crate::features::lattice::Lattice;
use crate::shared::utils::log_prob::prob_to_log_p;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PruneOutcome {
    Pruned { removed: usize, rounds: usize },
    /// Forward-backward found no complete path; the lattice is unchanged
    /// since the last successful round
    NoPaths,
}

impl PruneOutcome {
    pub fn removed(&self) -> usize {
        match self {
            PruneOutcome::Pruned { removed, .. } => *removed,
            PruneOutcome::NoPaths => 0,
        }
    }
}

pub fn prune_lattice(
    lattice: &mut Lattice,
    prune: &PruneConfig,
    posterior: &PosteriorConfig,
) -> Result<PruneOutcome> {
    let log_threshold = prob_to_log_p(prune.threshold);
    let initial = lattice.initial();
    let final_node = lattice.final_node();
    let mut removed = 0;
    let mut rounds = 0;

    while rounds < prune.max_iterations {
        rounds += 1;
        let fb = compute_forward_backward(lattice, posterior.posterior_scale);
        if !fb.has_paths() {
            warn!(lattice = lattice.name(), "no complete path left, pruning stopped");
            return Ok(PruneOutcome::NoPaths);
        }
        let reference = match prune.normalization {
            PosteriorNormalization::MaxMin => fb.bottleneck,
            PosteriorNormalization::Total => fb.total,
        };

        let doomed: Vec<_> = lattice
            .node_indices()
            .into_iter()
            .filter(|&n| n != initial && n != final_node)
            .filter(|&n| {
                lattice
                    .node(n)
                    .map(|node| node.posterior - reference < log_threshold)
                    .unwrap_or(false)
            })
            .collect();

        if doomed.is_empty() || doomed.len() >= lattice.num_nodes() {
            break;
        }
        for node in &doomed {
            lattice.remove_node(*node)?;
        }
        removed += doomed.len();
        debug!(
            lattice = lattice.name(),
            round = rounds,
            removed = doomed.len(),
            remaining = lattice.num_nodes(),
            "pruning round"
        );
    }

    Ok(PruneOutcome::Pruned { removed, rounds })
}
