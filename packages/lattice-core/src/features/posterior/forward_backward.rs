//! Forward-backward posterior computation
//!
//! ```text
//! alpha[u] = loop(u) + logsum_{p -> u} (alpha[p] + w(p,u))      alpha[initial] = loop(initial)
//! beta[u]  = logsum_{u -> v} (w(u,v) + loop(v) + beta[v])        beta[final] = 0
//! posterior[u] = alpha[u] + beta[u]
//! loop(u) = -log10(1 - 10^w(u,u))    (0 when u has no self-loop)
//! ```
//!
//! A second pass computes the bottleneck (max-min) posterior: the best, over
//! complete paths, of the smallest node posterior on the path. It is
//! [`LOG_P_ZERO`] when no complete path exists.

use tracing::{debug, warn};

use crate::features::lattice::{sort_nodes, Lattice};
use crate::shared::models::NodeIndex;
use crate::shared::utils::log_prob::{add_log_p, loop_closure, LogP, LOG_P_ONE, LOG_P_ZERO};

/// Forward-backward results, indexed by node index
#[derive(Debug, Clone)]
pub struct ForwardBackward {
    pub forward: Vec<LogP>,
    pub backward: Vec<LogP>,
    /// Self-loop closure factor per node
    pub closure: Vec<LogP>,
    /// Reachable nodes in topological order
    pub order: Vec<NodeIndex>,
    /// Total lattice mass (forward probability of the final node)
    pub total: LogP,
    /// Max-min posterior; [`LOG_P_ZERO`] when the lattice has no complete path
    pub bottleneck: LogP,
    pub posterior_scale: f64,
}

impl ForwardBackward {
    pub fn has_paths(&self) -> bool {
        self.bottleneck != LOG_P_ZERO
    }

    /// Unnormalized node posterior
    pub fn node_posterior(&self, node: NodeIndex) -> LogP {
        let i = node as usize;
        match (self.forward.get(i), self.backward.get(i)) {
            (Some(f), Some(b)) => f + b,
            _ => LOG_P_ZERO,
        }
    }

    /// Unnormalized posterior of the transition `from -> to` with `weight`
    pub fn transition_posterior(&self, from: NodeIndex, to: NodeIndex, weight: LogP) -> LogP {
        if from == to {
            return LOG_P_ZERO;
        }
        let (f, t) = (from as usize, to as usize);
        if f >= self.forward.len() || t >= self.backward.len() {
            return LOG_P_ZERO;
        }
        self.forward[f] + weight / self.posterior_scale + self.closure[t] + self.backward[t]
    }
}

/// Run forward-backward and store each node's posterior on the node.
///
/// Returns the bottleneck posterior in [`ForwardBackward::bottleneck`];
/// callers must check [`ForwardBackward::has_paths`] before using the rest.
pub fn compute_forward_backward(lattice: &mut Lattice, posterior_scale: f64) -> ForwardBackward {
    let size = lattice.max_index() as usize;
    let order = sort_nodes(lattice);
    let mut result = ForwardBackward {
        forward: vec![LOG_P_ZERO; size],
        backward: vec![LOG_P_ZERO; size],
        closure: vec![LOG_P_ONE; size],
        order,
        total: LOG_P_ZERO,
        bottleneck: LOG_P_ZERO,
        posterior_scale,
    };

    for index in lattice.node_indices() {
        if let Some(node) = lattice.node_mut(index) {
            node.posterior = LOG_P_ZERO;
        }
    }

    let initial = lattice.initial();
    let final_node = lattice.final_node();
    if result.order.first() != Some(&initial) {
        warn!(lattice = lattice.name(), "initial node is not first in topological order");
        return result;
    }

    for &node in &result.order {
        if let Some(self_loop) = lattice.self_loop(node) {
            match loop_closure(self_loop.weight / posterior_scale) {
                Some(closure) => result.closure[node as usize] = closure,
                None => warn!(
                    lattice = lattice.name(),
                    node,
                    weight = self_loop.weight,
                    "self-loop carries no exit mass, ignoring it"
                ),
            }
        }
    }

    // forward pass
    result.forward[initial as usize] = result.closure[initial as usize];
    for &node in &result.order {
        let alpha = result.forward[node as usize];
        if alpha == LOG_P_ZERO {
            continue;
        }
        for (next, transition) in lattice.out_transitions(node) {
            if next == node {
                continue;
            }
            let n = next as usize;
            let arriving = alpha + transition.weight / posterior_scale + result.closure[n];
            result.forward[n] = add_log_p(result.forward[n], arriving);
        }
    }

    // backward pass
    if lattice.contains(final_node) {
        result.backward[final_node as usize] = LOG_P_ONE;
    }
    for &node in result.order.iter().rev() {
        if node == final_node {
            continue;
        }
        let mut beta = LOG_P_ZERO;
        for (next, transition) in lattice.out_transitions(node) {
            if next == node {
                continue;
            }
            let n = next as usize;
            beta = add_log_p(
                beta,
                transition.weight / posterior_scale + result.closure[n] + result.backward[n],
            );
        }
        result.backward[node as usize] = beta;
    }

    result.total = result
        .forward
        .get(final_node as usize)
        .copied()
        .unwrap_or(LOG_P_ZERO);

    for &node in &result.order {
        let posterior = result.node_posterior(node);
        if let Some(n) = lattice.node_mut(node) {
            n.posterior = posterior;
        }
    }

    result.bottleneck = max_min_posterior(lattice, &result);
    debug!(
        lattice = lattice.name(),
        total = result.total,
        bottleneck = result.bottleneck,
        reachable = result.order.len(),
        "forward-backward done"
    );
    result
}

/// Bottleneck posterior over the topological order
fn max_min_posterior(lattice: &Lattice, fb: &ForwardBackward) -> LogP {
    let final_node = lattice.final_node();
    let mut best = vec![LOG_P_ZERO; fb.forward.len()];

    let Some((&first, rest)) = fb.order.split_first() else {
        return LOG_P_ZERO;
    };
    best[first as usize] = LOG_P_ONE;

    for &node in rest {
        let incoming = lattice
            .in_transitions(node)
            .into_iter()
            .filter(|(pred, _)| *pred != node)
            .map(|(pred, _)| best[pred as usize])
            .fold(LOG_P_ZERO, LogP::max);
        best[node as usize] = fb.node_posterior(node).min(incoming);
    }

    if !lattice.contains(final_node) || !fb.order.contains(&final_node) {
        return LOG_P_ZERO;
    }
    best[final_node as usize]
}
