//! PFSG reader
//!
//! ```text
//! name <name>
//! nodes <N> <label_0> ... <label_N-1>
//! initial <index>
//! final <index>
//! transitions <M>
//! <from> <to> <intlog>
//! ...
//! ```
//!
//! A file may hold several graphs. The first one is the result; nodes whose
//! label names another graph in the file are replaced by a copy of that
//! graph. Lines starting with `#` are comments.

use std::path::Path;

use ahash::AHashMap;
use tracing::debug;

use crate::config::AdjacencyBackend;
use crate::errors::{LatticeError, Result};
use crate::features::algebra::implant;
use crate::features::lattice::Lattice;
use crate::shared::models::{CombinePolicy, NodeIndex, Transition};
use crate::shared::ports::Vocabulary;
use crate::shared::utils::log_prob::intlog_to_log_p;

/// Whitespace tokens tagged with their 1-based line number
struct Tokens<'a> {
    tokens: Vec<(usize, &'a str)>,
    cursor: usize,
    last_line: usize,
}

impl<'a> Tokens<'a> {
    fn new(text: &'a str) -> Self {
        let tokens: Vec<_> = text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim_start().starts_with('#'))
            .flat_map(|(i, line)| line.split_whitespace().map(move |tok| (i + 1, tok)))
            .collect();
        let last_line = text.lines().count().max(1);
        Self {
            tokens,
            cursor: 0,
            last_line,
        }
    }

    fn peek(&self) -> Option<&'a str> {
        self.tokens.get(self.cursor).map(|(_, tok)| *tok)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.cursor)
            .map(|(line, _)| *line)
            .unwrap_or(self.last_line)
    }

    fn next(&mut self, what: &str) -> Result<(usize, &'a str)> {
        match self.tokens.get(self.cursor) {
            Some(&(line, tok)) => {
                self.cursor += 1;
                Ok((line, tok))
            }
            None => Err(LatticeError::parse(
                self.last_line,
                format!("unexpected end of input, expected {}", what),
            )),
        }
    }

    fn number<T: std::str::FromStr>(&mut self, what: &str) -> Result<T> {
        let (line, tok) = self.next(what)?;
        tok.parse()
            .map_err(|_| LatticeError::parse(line, format!("expected {}, found '{}'", what, tok)))
    }
}

fn node_index(line: usize, value: NodeIndex, count: usize, what: &str) -> Result<NodeIndex> {
    if (value as usize) < count {
        Ok(value)
    } else {
        Err(LatticeError::parse(
            line,
            format!("{} {} out of range (graph has {} nodes)", what, value, count),
        ))
    }
}

/// Parse the graph starting at the current `name` keyword
fn parse_graph(
    tokens: &mut Tokens<'_>,
    vocab: &mut dyn Vocabulary,
    backend: AdjacencyBackend,
) -> Result<Lattice> {
    let (line, keyword) = tokens.next("'name'")?;
    if keyword != "name" {
        return Err(LatticeError::parse(line, format!("expected 'name', found '{}'", keyword)));
    }
    let (_, name) = tokens.next("graph name")?;
    let start_line = line;
    let mut lattice = Lattice::with_backend(name, backend);
    let mut count: Option<usize> = None;
    let mut initial = None;
    let mut final_node = None;

    while let Some(keyword) = tokens.peek() {
        let line = tokens.line();
        match keyword {
            "name" => break,
            "nodes" => {
                tokens.next("'nodes'")?;
                let n: usize = tokens.number("node count")?;
                for index in 0..n {
                    let (_, label) = tokens.next("node label")?;
                    let word = vocab.label_from_str(label);
                    lattice.insert_node(index as NodeIndex, word);
                }
                count = Some(n);
            }
            "initial" | "final" => {
                tokens.next(keyword)?;
                let n = count.ok_or_else(|| {
                    LatticeError::parse(line, format!("'{}' before 'nodes'", keyword))
                })?;
                let index = node_index(line, tokens.number("node index")?, n, keyword)?;
                if keyword == "initial" {
                    initial = Some(index);
                } else {
                    final_node = Some(index);
                }
            }
            "transitions" => {
                tokens.next("'transitions'")?;
                let n = count.ok_or_else(|| LatticeError::parse(line, "'transitions' before 'nodes'"))?;
                let m: usize = tokens.number("transition count")?;
                for _ in 0..m {
                    let line = tokens.line();
                    let from = node_index(line, tokens.number("source node")?, n, "source node")?;
                    let to = node_index(line, tokens.number("target node")?, n, "target node")?;
                    let intlog: i64 = tokens.number("intlog weight")?;
                    lattice.insert_transition(
                        from,
                        to,
                        Transition::new(intlog_to_log_p(intlog)),
                        CombinePolicy::Max,
                    )?;
                }
            }
            other => {
                return Err(LatticeError::parse(line, format!("unknown keyword '{}'", other)));
            }
        }
    }

    let missing = |what: &str| LatticeError::parse(start_line, format!("graph '{}' has no {}", name, what));
    count.ok_or_else(|| missing("'nodes' section"))?;
    lattice.set_initial(initial.ok_or_else(|| missing("initial node"))?);
    lattice.set_final(final_node.ok_or_else(|| missing("final node"))?);
    Ok(lattice)
}

/// Parse every graph in `text` without resolving sub-graph references
pub fn parse_graphs(text: &str, vocab: &mut dyn Vocabulary, backend: AdjacencyBackend) -> Result<Vec<Lattice>> {
    let mut tokens = Tokens::new(text);
    let mut graphs = Vec::new();
    while tokens.peek().is_some() {
        graphs.push(parse_graph(&mut tokens, vocab, backend)?);
    }
    if graphs.is_empty() {
        return Err(LatticeError::parse(1, "no graph found"));
    }
    Ok(graphs)
}

/// Copy of graph `name` with every sub-graph reference implanted
fn flatten(
    name: &str,
    graphs: &AHashMap<String, Lattice>,
    vocab: &dyn Vocabulary,
    active: &mut Vec<String>,
) -> Result<Lattice> {
    let mut lattice = graphs
        .get(name)
        .cloned()
        .ok_or_else(|| LatticeError::structure(format!("no graph named '{}'", name)))?;
    active.push(name.to_string());

    for node in lattice.node_indices() {
        let Some(word) = lattice.word(node).flatten() else {
            continue;
        };
        let Some(label) = vocab.id_to_string(word) else {
            continue;
        };
        if !graphs.contains_key(label) {
            continue;
        }
        if active.iter().any(|a| a == label) {
            return Err(LatticeError::structure(format!(
                "graph '{}' refers to itself through '{}'",
                active[0], label
            )));
        }
        let label = label.to_string();
        let sub = flatten(&label, graphs, vocab, active)?;
        implant(&mut lattice, node, &sub)?;
        debug!(graph = name, node, sub = label.as_str(), "expanded sub-graph reference");
    }

    active.pop();
    Ok(lattice)
}

/// Read a PFSG text, resolving nested sub-graphs into the first graph
pub fn read_pfsg(text: &str, vocab: &mut dyn Vocabulary, backend: AdjacencyBackend) -> Result<Lattice> {
    let mut graphs = parse_graphs(text, vocab, backend)?;
    if graphs.len() == 1 {
        return Ok(graphs.remove(0));
    }
    let top = graphs[0].name().to_string();
    let by_name: AHashMap<String, Lattice> = graphs
        .into_iter()
        .map(|g| (g.name().to_string(), g))
        .collect();
    let mut lattice = flatten(&top, &by_name, vocab, &mut Vec::new())?;
    lattice.set_name(top);
    Ok(lattice)
}

pub fn read_pfsg_file(
    path: impl AsRef<Path>,
    vocab: &mut dyn Vocabulary,
    backend: AdjacencyBackend,
) -> Result<Lattice> {
    let text = std::fs::read_to_string(path.as_ref())?;
    read_pfsg(&text, vocab, backend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::posterior::best_path;
    use crate::shared::ports::SymbolTable;
    use crate::shared::utils::log_prob::log_p_to_intlog;

    const SIMPLE: &str = "\
name simple
nodes 4 NULL a b NULL
initial 0
final 3
transitions 4
0 1 -500
0 2 -2000
1 3 0
2 3 0
";

    #[test]
    fn test_parse_simple() {
        let mut vocab = SymbolTable::new();
        let lat = read_pfsg(SIMPLE, &mut vocab, AdjacencyBackend::Hashed).unwrap();
        assert_eq!(lat.name(), "simple");
        assert_eq!(lat.num_nodes(), 4);
        assert_eq!(lat.num_transitions(), 4);
        assert_eq!(lat.word(0), Some(None));
        assert_eq!(lat.word(1), Some(vocab.lookup("a")));
        assert_eq!(lat.initial(), 0);
        assert_eq!(lat.final_node(), 3);
        assert_eq!(log_p_to_intlog(lat.find_transition(0, 2).unwrap().weight), -2000);
    }

    #[test]
    fn test_labels_may_wrap_lines() {
        let text = "name w\nnodes 3 NULL\nx NULL\ninitial 0\nfinal 2\ntransitions 2\n0 1 0\n1 2 0\n";
        let mut vocab = SymbolTable::new();
        let lat = read_pfsg(text, &mut vocab, AdjacencyBackend::Sorted).unwrap();
        assert_eq!(lat.word(1), Some(vocab.lookup("x")));
    }

    #[test]
    fn test_out_of_range_transition() {
        let text = "name bad\nnodes 2 NULL NULL\ninitial 0\nfinal 1\ntransitions 1\n0 5 0\n";
        let mut vocab = SymbolTable::new();
        let err = read_pfsg(text, &mut vocab, AdjacencyBackend::Hashed).unwrap_err();
        assert!(matches!(err, LatticeError::Parse { line: 6, .. }), "{}", err);
    }

    #[test]
    fn test_missing_final() {
        let text = "name bad\nnodes 2 NULL NULL\ninitial 0\ntransitions 0\n";
        let mut vocab = SymbolTable::new();
        let err = read_pfsg(text, &mut vocab, AdjacencyBackend::Hashed).unwrap_err();
        assert!(matches!(err, LatticeError::Parse { .. }));
    }

    #[test]
    fn test_truncated_transitions() {
        let text = "name bad\nnodes 2 NULL NULL\ninitial 0\nfinal 1\ntransitions 2\n0 1 0\n";
        let mut vocab = SymbolTable::new();
        assert!(read_pfsg(text, &mut vocab, AdjacencyBackend::Hashed).is_err());
    }

    #[test]
    fn test_nested_graphs_are_implanted() {
        let text = "\
name top
nodes 4 NULL a SUB NULL
initial 0
final 3
transitions 3
0 1 0
1 2 0
2 3 0

name SUB
nodes 4 NULL x y NULL
initial 0
final 3
transitions 3
0 1 0
1 2 0
2 3 0
";
        let mut vocab = SymbolTable::new();
        let lat = read_pfsg(text, &mut vocab, AdjacencyBackend::Hashed).unwrap();
        assert_eq!(lat.name(), "top");
        assert!(lat.check_consistency().is_ok());
        let path = best_path(&lat).unwrap();
        let words: Vec<_> = path
            .nodes
            .iter()
            .filter_map(|&n| lat.word(n).flatten())
            .map(|w| vocab.id_to_string(w).unwrap().to_string())
            .collect();
        assert_eq!(words, vec!["a", "x", "y"]);
    }

    #[test]
    fn test_recursive_graphs_fail() {
        let text = "\
name top
nodes 3 NULL loop NULL
initial 0
final 2
transitions 2
0 1 0
1 2 0
name loop
nodes 3 NULL top NULL
initial 0
final 2
transitions 2
0 1 0
1 2 0
";
        let mut vocab = SymbolTable::new();
        let err = read_pfsg(text, &mut vocab, AdjacencyBackend::Hashed).unwrap_err();
        assert!(matches!(err, LatticeError::Structure(_)));
    }
}
