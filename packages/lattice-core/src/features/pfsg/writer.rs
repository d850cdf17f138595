//! PFSG writers
//!
//! [`write_pfsg`] keeps node indices as they are, writing `NULL` for the
//! slots of removed nodes. [`write_pfsg_compact`] renumbers the reachable
//! nodes contiguously in topological order and drops everything else.

use std::io::Write;
use std::path::Path;

use crate::errors::Result;
use crate::features::lattice::{sort_nodes, Lattice};
use crate::shared::models::NodeIndex;
use crate::shared::ports::Vocabulary;
use crate::shared::utils::log_prob::log_p_to_intlog;

fn write_labels<W: Write>(out: &mut W, labels: &[String]) -> Result<()> {
    write!(out, "nodes {}", labels.len())?;
    for label in labels {
        write!(out, " {}", label)?;
    }
    writeln!(out)?;
    Ok(())
}

fn write_transitions<W: Write>(out: &mut W, transitions: &[(NodeIndex, NodeIndex, i64)]) -> Result<()> {
    writeln!(out, "transitions {}", transitions.len())?;
    for (from, to, intlog) in transitions {
        writeln!(out, "{} {} {}", from, to, intlog)?;
    }
    Ok(())
}

/// Write `lattice` with its own node indices
pub fn write_pfsg<W: Write>(lattice: &Lattice, vocab: &dyn Vocabulary, out: &mut W) -> Result<()> {
    let labels: Vec<String> = (0..lattice.max_index())
        .map(|index| vocab.label_to_string(lattice.word(index).flatten()))
        .collect();

    let mut transitions = Vec::with_capacity(lattice.num_transitions());
    for from in lattice.node_indices() {
        let mut out_transitions = lattice.out_transitions(from);
        out_transitions.sort_unstable_by_key(|(to, _)| *to);
        for (to, transition) in out_transitions {
            transitions.push((from, to, log_p_to_intlog(transition.weight)));
        }
    }

    writeln!(out, "name {}", lattice.name())?;
    write_labels(out, &labels)?;
    writeln!(out, "initial {}", lattice.initial())?;
    writeln!(out, "final {}", lattice.final_node())?;
    write_transitions(out, &transitions)?;
    Ok(())
}

/// Write only the reachable part of `lattice`, renumbered from 0 in
/// topological order. The final node is kept even when unreachable.
pub fn write_pfsg_compact<W: Write>(lattice: &Lattice, vocab: &dyn Vocabulary, out: &mut W) -> Result<()> {
    let mut order = sort_nodes(lattice);
    let final_node = lattice.final_node();
    if lattice.contains(final_node) && !order.contains(&final_node) {
        order.push(final_node);
    }

    let mut renumbered: Vec<Option<NodeIndex>> = vec![None; lattice.max_index() as usize];
    for (new, &old) in order.iter().enumerate() {
        renumbered[old as usize] = Some(new as NodeIndex);
    }
    let new_index = |old: NodeIndex| renumbered.get(old as usize).copied().flatten();

    let labels: Vec<String> = order
        .iter()
        .map(|&node| vocab.label_to_string(lattice.word(node).flatten()))
        .collect();

    let mut transitions = Vec::with_capacity(lattice.num_transitions());
    for &from in &order {
        let mut out_transitions: Vec<_> = lattice
            .out_transitions(from)
            .into_iter()
            .filter_map(|(to, t)| new_index(to).map(|to| (to, t)))
            .collect();
        out_transitions.sort_unstable_by_key(|(to, _)| *to);
        let Some(from) = new_index(from) else { continue };
        for (to, transition) in out_transitions {
            transitions.push((from, to, log_p_to_intlog(transition.weight)));
        }
    }

    writeln!(out, "name {}", lattice.name())?;
    write_labels(out, &labels)?;
    writeln!(out, "initial {}", new_index(lattice.initial()).unwrap_or(0))?;
    writeln!(out, "final {}", new_index(final_node).unwrap_or(0))?;
    write_transitions(out, &transitions)?;
    Ok(())
}

/// PFSG text of `lattice`
pub fn pfsg_to_string(lattice: &Lattice, vocab: &dyn Vocabulary, compact: bool) -> Result<String> {
    let mut buffer = Vec::new();
    if compact {
        write_pfsg_compact(lattice, vocab, &mut buffer)?;
    } else {
        write_pfsg(lattice, vocab, &mut buffer)?;
    }
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

pub fn write_pfsg_file(
    lattice: &Lattice,
    vocab: &dyn Vocabulary,
    path: impl AsRef<Path>,
    compact: bool,
) -> Result<()> {
    let file = std::fs::File::create(path.as_ref())?;
    let mut out = std::io::BufWriter::new(file);
    if compact {
        write_pfsg_compact(lattice, vocab, &mut out)?;
    } else {
        write_pfsg(lattice, vocab, &mut out)?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdjacencyBackend;
    use crate::features::pfsg::reader::read_pfsg;
    use crate::shared::ports::SymbolTable;
    use pretty_assertions::assert_eq;

    const TEXT: &str = "\
name t
nodes 5 NULL a b c NULL
initial 0
final 4
transitions 5
0 1 -100
0 2 -200
1 4 0
2 4 0
3 4 -7
";

    #[test]
    fn test_plain_writer_round_trips() {
        let mut vocab = SymbolTable::new();
        let lat = read_pfsg(TEXT, &mut vocab, AdjacencyBackend::Hashed).unwrap();
        let written = pfsg_to_string(&lat, &vocab, false).unwrap();
        assert_eq!(written, TEXT);
    }

    #[test]
    fn test_removed_nodes_are_written_as_null() {
        let mut vocab = SymbolTable::new();
        let mut lat = read_pfsg(TEXT, &mut vocab, AdjacencyBackend::Hashed).unwrap();
        lat.remove_node(2).unwrap();
        let written = pfsg_to_string(&lat, &vocab, false).unwrap();
        assert!(written.contains("nodes 5 NULL a NULL c NULL"));
        assert!(written.contains("transitions 3\n"));
    }

    #[test]
    fn test_compact_writer_drops_unreachable() {
        let mut vocab = SymbolTable::new();
        let lat = read_pfsg(TEXT, &mut vocab, AdjacencyBackend::Sorted).unwrap();
        let written = pfsg_to_string(&lat, &vocab, true).unwrap();
        let reread = read_pfsg(&written, &mut vocab, AdjacencyBackend::Sorted).unwrap();
        assert_eq!(reread.num_nodes(), 4);
        assert_eq!(reread.num_transitions(), 4);
        assert_eq!(reread.initial(), 0);
        assert_eq!(reread.word(reread.final_node()), Some(None));
    }
}
