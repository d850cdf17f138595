//! Log-domain probability arithmetic
//!
//! All lattice weights are base-10 log-probabilities. Zero probability is
//! represented by negative infinity, which every helper here propagates
//! without producing NaN.

use std::f64::consts::LN_10;

use crate::shared::constants::intlog::{MIN_INTLOG, SCALE};

/// Base-10 log-probability
pub type LogP = f64;

/// log10(0)
pub const LOG_P_ZERO: LogP = f64::NEG_INFINITY;

/// log10(1)
pub const LOG_P_ONE: LogP = 0.0;

/// Numerically stable `log10(10^x + 10^y)`
pub fn add_log_p(x: LogP, y: LogP) -> LogP {
    let (hi, lo) = if x < y { (y, x) } else { (x, y) };
    if lo == LOG_P_ZERO {
        hi
    } else {
        hi + (10f64.powf(lo - hi)).ln_1p() / LN_10
    }
}

/// `log10(1 - 10^x)`, or `None` when `x >= 0` (no mass left)
pub fn log_one_minus(x: LogP) -> Option<LogP> {
    if x >= LOG_P_ONE {
        return None;
    }
    if x == LOG_P_ZERO {
        return Some(LOG_P_ONE);
    }
    Some((-(10f64.powf(x))).ln_1p() / LN_10)
}

/// Self-loop closure factor `-log10(1 - 10^loop)`: the mass of looping any
/// number of times before leaving a node
pub fn loop_closure(loop_weight: LogP) -> Option<LogP> {
    log_one_minus(loop_weight).map(|rest| -rest)
}

pub fn prob_to_log_p(prob: f64) -> LogP {
    if prob <= 0.0 {
        LOG_P_ZERO
    } else {
        prob.log10()
    }
}

pub fn log_p_to_prob(log_p: LogP) -> f64 {
    10f64.powf(log_p)
}

/// Convert a PFSG intlog weight (scaled natural log) to a log10 weight
///
/// Clamped weights stay finite: a stored [`MIN_INTLOG`] reads back as a very
/// small probability, not as zero.
pub fn intlog_to_log_p(intlog: i64) -> LogP {
    intlog as f64 / SCALE / LN_10
}

/// Convert a log10 weight to a PFSG intlog weight, clamped at [`MIN_INTLOG`]
pub fn log_p_to_intlog(log_p: LogP) -> i64 {
    if log_p == LOG_P_ZERO || log_p.is_nan() {
        return MIN_INTLOG;
    }
    let scaled = (log_p * LN_10 * SCALE).round();
    if scaled < MIN_INTLOG as f64 {
        MIN_INTLOG
    } else {
        scaled as i64
    }
}
