//! Lattice minimization by node merging

pub mod approx_merge;
pub mod exact_merge;

pub use approx_merge::merge_approximate;
pub use exact_merge::{merge_exact, merge_pass};

use serde::Serialize;
use tracing::info;

use crate::config::MergeConfig;
use crate::errors::Result;
use crate::features::lattice::{Direction, Lattice};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    pub exact: usize,
    pub approximate: usize,
}

/// Exact merging, then (when `overlap_ratio > 0`) approximate passes in both
/// directions followed by another exact round to clean up what they expose
pub fn minimize(lattice: &mut Lattice, config: &MergeConfig) -> Result<MergeSummary> {
    let mut summary = MergeSummary {
        exact: merge_exact(lattice, config)?,
        ..MergeSummary::default()
    };

    if config.overlap_ratio > 0.0 {
        summary.approximate += merge_approximate(lattice, config, Direction::Backward)?;
        summary.approximate += merge_approximate(lattice, config, Direction::Forward)?;
        if summary.approximate > 0 {
            summary.exact += merge_exact(lattice, config)?;
        }
    }

    info!(
        lattice = lattice.name(),
        exact = summary.exact,
        approximate = summary.approximate,
        nodes = lattice.num_nodes(),
        "minimized"
    );
    Ok(summary)
}
