//! Reinsertion of pause nodes on pause-absorbing transitions
//!
//! A recovered pause node can carry a self-loop with probability `q`. Its
//! exit transitions then get `1 - q` so the mass through the pause is the
//! same as on the absorbing transition it replaces.

use std::collections::BTreeMap;

use tracing::debug;

use crate::errors::{LatticeError, Result};
use crate::features::lattice::Lattice;
use crate::shared::models::{CombinePolicy, NodeFlags, NodeIndex, Transition, TransitionFlags, WordId};
use crate::shared::utils::log_prob::{log_one_minus, LogP, LOG_P_ONE};

/// How recovered pause nodes are laid out
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PauseRecovery {
    pub pause: WordId,
    /// Self-loop weight of each new pause node
    pub self_loop: Option<LogP>,
    /// One shared pause node per source node instead of one per transition
    pub compact: bool,
}

impl PauseRecovery {
    pub fn new(pause: WordId) -> Self {
        Self {
            pause,
            self_loop: None,
            compact: false,
        }
    }

    fn exit_weight(&self) -> Result<LogP> {
        match self.self_loop {
            None => Ok(LOG_P_ONE),
            Some(w) => log_one_minus(w).ok_or_else(|| {
                LatticeError::InvalidWeight(format!("pause self-loop weight {} leaves no exit mass", w))
            }),
        }
    }

    fn new_pause_node(&self, lattice: &mut Lattice) -> Result<NodeIndex> {
        let node = lattice.duplicate_node(Some(self.pause), NodeFlags::NONE);
        if let Some(w) = self.self_loop {
            lattice.insert_transition(node, node, Transition::new(w), CombinePolicy::Max)?;
        }
        Ok(node)
    }
}

/// Drop the pause marks of `from -> to`, or the transition itself when it
/// does not also stand for a direct connection
fn retire_absorbing(lattice: &mut Lattice, from: NodeIndex, to: NodeIndex, flags: TransitionFlags) -> Result<()> {
    if flags.contains(TransitionFlags::DIRECT) {
        lattice.unmark_transition(from, to, TransitionFlags::PAUSE | TransitionFlags::DIRECT)
    } else {
        lattice.remove_transition(from, to).map(|_| ())
    }
}

fn pause_transitions(lattice: &Lattice) -> Vec<(NodeIndex, NodeIndex, Transition)> {
    lattice
        .node_indices()
        .into_iter()
        .flat_map(|from| {
            let mut out = lattice.out_transitions(from);
            out.sort_unstable_by_key(|(to, _)| *to);
            out.into_iter()
                .filter(|(_, t)| t.flags.contains(TransitionFlags::PAUSE))
                .map(move |(to, t)| (from, to, t))
        })
        .collect()
}

/// Insert pause nodes for every pause-flagged transition. Returns the
/// number of pause nodes created.
pub fn recover_pauses(lattice: &mut Lattice, options: &PauseRecovery) -> Result<usize> {
    let exit = options.exit_weight()?;
    let absorbing = pause_transitions(lattice);
    let mut created = 0;

    if options.compact {
        let mut by_source: BTreeMap<NodeIndex, Vec<(NodeIndex, Transition)>> = BTreeMap::new();
        for (from, to, t) in absorbing {
            by_source.entry(from).or_default().push((to, t));
        }
        for (from, targets) in by_source {
            let pause = options.new_pause_node(lattice)?;
            created += 1;
            lattice.insert_transition(from, pause, Transition::new(LOG_P_ONE), CombinePolicy::Max)?;
            for (to, t) in targets {
                lattice.insert_transition(pause, to, Transition::new(t.weight + exit), CombinePolicy::Max)?;
                retire_absorbing(lattice, from, to, t.flags)?;
            }
        }
    } else {
        for (from, to, t) in absorbing {
            let pause = options.new_pause_node(lattice)?;
            created += 1;
            lattice.insert_transition(from, pause, Transition::new(t.weight), CombinePolicy::Max)?;
            lattice.insert_transition(pause, to, Transition::new(exit), CombinePolicy::Max)?;
            retire_absorbing(lattice, from, to, t.flags)?;
        }
    }

    debug!(lattice = lattice.name(), created, compact = options.compact, "recovered pauses");
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::null_collapse::collapse::collapse_pauses;
    use crate::shared::utils::log_prob::prob_to_log_p;

    const PAU: WordId = 50;

    /// 0 -> a(1) -> {b(2), c(3)} -> 4 with both transitions out of 1
    /// absorbing a pause
    fn absorbed() -> Lattice {
        let mut lat = Lattice::new("r");
        for (i, w) in [None, Some(1), Some(2), Some(3), None].iter().enumerate() {
            lat.insert_node(i as NodeIndex, *w);
        }
        lat.set_initial(0);
        lat.set_final(4);
        let pause = TransitionFlags::PAUSE;
        let direct = TransitionFlags::PAUSE | TransitionFlags::DIRECT;
        let edges = [
            (0, 1, Transition::new(0.0)),
            (1, 2, Transition::with_flags(-0.3, pause)),
            (1, 3, Transition::with_flags(-0.4, direct)),
            (2, 4, Transition::new(0.0)),
            (3, 4, Transition::new(0.0)),
        ];
        for (f, t, tr) in edges {
            lat.insert_transition(f, t, tr, CombinePolicy::Max).unwrap();
        }
        lat
    }

    #[test]
    fn test_per_transition_recovery() {
        let mut lat = absorbed();
        let created = recover_pauses(&mut lat, &PauseRecovery::new(PAU)).unwrap();
        assert_eq!(created, 2);
        // pause-only transition is replaced, the direct one stays unmarked
        assert!(lat.find_transition(1, 2).is_none());
        let direct = lat.find_transition(1, 3).unwrap();
        assert_eq!(direct.flags, TransitionFlags::NONE);
        let pauses: Vec<_> = lat
            .node_indices()
            .into_iter()
            .filter(|&n| lat.word(n) == Some(Some(PAU)))
            .collect();
        assert_eq!(pauses.len(), 2);
        assert_eq!(lat.find_transition(1, pauses[0]).unwrap().weight, -0.3);
        assert!(lat.check_consistency().is_ok());
    }

    #[test]
    fn test_compact_recovery_shares_node() {
        let mut lat = absorbed();
        let options = PauseRecovery {
            compact: true,
            ..PauseRecovery::new(PAU)
        };
        let created = recover_pauses(&mut lat, &options).unwrap();
        assert_eq!(created, 1);
        let pause = lat.max_index() - 1;
        assert_eq!(lat.find_transition(1, pause).unwrap().weight, LOG_P_ONE);
        assert_eq!(lat.find_transition(pause, 2).unwrap().weight, -0.3);
        assert_eq!(lat.find_transition(pause, 3).unwrap().weight, -0.4);
    }

    #[test]
    fn test_looped_pause_preserves_mass() {
        let mut lat = absorbed();
        let options = PauseRecovery {
            self_loop: Some(prob_to_log_p(0.5)),
            ..PauseRecovery::new(PAU)
        };
        recover_pauses(&mut lat, &options).unwrap();
        // collapsing the recovered pauses again restores the original weights
        collapse_pauses(&mut lat, PAU).unwrap();
        let t = lat.find_transition(1, 2).unwrap();
        assert!((t.weight - -0.3).abs() < 1e-12);
        assert!(t.flags.contains(TransitionFlags::PAUSE));
    }

    #[test]
    fn test_invalid_loop_weight() {
        let mut lat = absorbed();
        let options = PauseRecovery {
            self_loop: Some(0.0),
            ..PauseRecovery::new(PAU)
        };
        assert!(recover_pauses(&mut lat, &options).is_err());
    }
}
