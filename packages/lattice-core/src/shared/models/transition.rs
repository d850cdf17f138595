//! Lattice transitions (weighted edges)

use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

use crate::shared::utils::log_prob::{LogP, LOG_P_ONE};

/// Transition marks (bitflags)
///
/// - `PAUSE`: the transition absorbed a pause node
/// - `DIRECT`: a pause-absorbing transition that also stands for a direct,
///   pause-free connection between its endpoints
/// - `RESERVED`: reserved for back-off bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TransitionFlags(pub u8);

impl TransitionFlags {
    pub const NONE: Self = Self(0);
    pub const PAUSE: Self = Self(1);
    pub const DIRECT: Self = Self(2);
    pub const RESERVED: Self = Self(4);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    pub fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// True when the transition offers a connection with no pause on it
    pub fn is_direct(self) -> bool {
        !self.contains(Self::PAUSE) || self.contains(Self::DIRECT)
    }

    /// Flags of an existing transition after another one is folded into it.
    ///
    /// Marks are OR'ed; when the result carries `PAUSE`, `DIRECT` survives if
    /// either side offered a pause-free connection.
    pub fn combine(existing: Self, added: Self) -> Self {
        let mut flags = existing | added;
        if flags.contains(Self::PAUSE) && (existing.is_direct() || added.is_direct()) {
            flags.insert(Self::DIRECT);
        }
        flags
    }
}

impl BitOr for TransitionFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for TransitionFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// A weighted transition between two nodes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    /// Base-10 log-probability
    pub weight: LogP,
    pub flags: TransitionFlags,
}

impl Transition {
    pub fn new(weight: LogP) -> Self {
        Self {
            weight,
            flags: TransitionFlags::NONE,
        }
    }

    pub fn with_flags(weight: LogP, flags: TransitionFlags) -> Self {
        Self { weight, flags }
    }
}

impl Default for Transition {
    fn default() -> Self {
        Self::new(LOG_P_ONE)
    }
}

/// How weights are combined when a transition is inserted over an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombinePolicy {
    /// Keep the larger weight (Viterbi union)
    #[default]
    Max,
    /// Log-sum of both weights (sum over paths)
    LogAdd,
}
