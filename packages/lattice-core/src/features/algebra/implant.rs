//! Sub-lattice implantation
//!
//! A donor lattice replaces one placeholder node of the host. Donor node
//! `i` becomes host node `host.max_index() + i`, so the new nodes never
//! collide with existing ones. The donor itself is only read.

use tracing::debug;

use crate::errors::{LatticeError, Result};
use crate::features::lattice::Lattice;
use crate::shared::models::{CombinePolicy, NodeIndex};

/// Splice `donor` into `host` in place of `placeholder`.
///
/// Transitions into the placeholder now enter the donor's initial node and
/// transitions out of it leave from the donor's final node; both of those
/// lose their labels. A self-loop on the placeholder becomes a transition
/// from the donor's final node back to its initial node.
pub fn implant(host: &mut Lattice, placeholder: NodeIndex, donor: &Lattice) -> Result<()> {
    if !host.contains(placeholder) {
        return Err(LatticeError::NodeNotFound(placeholder));
    }
    if !donor.contains(donor.initial()) || !donor.contains(donor.final_node()) {
        return Err(LatticeError::structure(format!(
            "lattice '{}' has no initial or final node to implant",
            donor.name()
        )));
    }

    let offset = host.max_index();
    for index in donor.node_indices() {
        if let Some(node) = donor.node(index) {
            host.insert_node(offset + index, node.word);
            host.mark_node(offset + index, node.flags);
        }
    }
    for index in donor.node_indices() {
        for (to, transition) in donor.out_transitions(index) {
            host.insert_transition(offset + index, offset + to, transition, CombinePolicy::Max)?;
        }
    }
    host.reserve_indices(offset + donor.max_index());

    let entry = offset + donor.initial();
    let exit = offset + donor.final_node();
    host.set_word(entry, None)?;
    host.set_word(exit, None)?;

    for (from, transition) in host.in_transitions(placeholder) {
        let from = if from == placeholder { exit } else { from };
        host.insert_transition(from, entry, transition, CombinePolicy::Max)?;
    }
    for (to, transition) in host.out_transitions(placeholder) {
        if to != placeholder {
            host.insert_transition(exit, to, transition, CombinePolicy::Max)?;
        }
    }

    if host.initial() == placeholder {
        host.set_initial(entry);
    }
    if host.final_node() == placeholder {
        host.set_final(exit);
    }
    host.remove_node(placeholder)?;

    debug!(
        host = host.name(),
        donor = donor.name(),
        placeholder,
        offset,
        "implanted sub-lattice"
    );
    Ok(())
}
