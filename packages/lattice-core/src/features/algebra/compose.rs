//! Concatenation and union of lattices
//!
//! Both build a four-node epsilon skeleton (0 = final, 1 = initial, 2 and 3
//! placeholders) and implant the operands at the placeholders.

use super::implant::implant;
use crate::errors::Result;
use crate::features::lattice::Lattice;
use crate::shared::models::{CombinePolicy, NodeIndex, Transition};

const FINAL: NodeIndex = 0;
const INITIAL: NodeIndex = 1;
const FIRST: NodeIndex = 2;
const SECOND: NodeIndex = 3;

fn skeleton(name: String, like: &Lattice, edges: &[(NodeIndex, NodeIndex)]) -> Result<Lattice> {
    let mut lattice = Lattice::with_backend(name, like.backend());
    for index in [FINAL, INITIAL, FIRST, SECOND] {
        lattice.insert_node(index, None);
    }
    lattice.set_initial(INITIAL);
    lattice.set_final(FINAL);
    for &(from, to) in edges {
        lattice.insert_transition(from, to, Transition::default(), CombinePolicy::Max)?;
    }
    Ok(lattice)
}

/// Paths of `first` followed by paths of `second`
pub fn concatenate(first: &Lattice, second: &Lattice) -> Result<Lattice> {
    let name = format!("{}+{}", first.name(), second.name());
    let mut result = skeleton(name, first, &[(INITIAL, FIRST), (FIRST, SECOND), (SECOND, FINAL)])?;
    implant(&mut result, FIRST, first)?;
    implant(&mut result, SECOND, second)?;
    Ok(result)
}

/// Paths of either lattice
pub fn union(first: &Lattice, second: &Lattice) -> Result<Lattice> {
    let name = format!("{}|{}", first.name(), second.name());
    let mut result = skeleton(
        name,
        first,
        &[(INITIAL, FIRST), (FIRST, FINAL), (INITIAL, SECOND), (SECOND, FINAL)],
    )?;
    implant(&mut result, FIRST, first)?;
    implant(&mut result, SECOND, second)?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::posterior::{best_path, compute_forward_backward};
    use crate::shared::utils::log_prob::{log_p_to_prob, prob_to_log_p};

    fn single(name: &str, word: u32, prob: f64) -> Lattice {
        let mut lat = Lattice::new(name);
        lat.insert_node(0, None);
        lat.insert_node(1, Some(word));
        lat.insert_node(2, None);
        lat.insert_transition(0, 1, Transition::new(prob_to_log_p(prob)), CombinePolicy::Max)
            .unwrap();
        lat.insert_transition(1, 2, Transition::default(), CombinePolicy::Max)
            .unwrap();
        lat.set_initial(0);
        lat.set_final(2);
        lat
    }

    fn words_on(lat: &Lattice, nodes: &[NodeIndex]) -> Vec<u32> {
        nodes.iter().filter_map(|&n| lat.word(n).flatten()).collect()
    }

    #[test]
    fn test_concatenate_sequences_words() {
        let a = single("a", 5, 0.5);
        let b = single("b", 6, 0.25);
        let ab = concatenate(&a, &b).unwrap();
        assert_eq!(ab.name(), "a+b");
        assert!(ab.check_consistency().is_ok());
        let path = best_path(&ab).unwrap();
        assert_eq!(words_on(&ab, &path.nodes), vec![5, 6]);
        assert!((log_p_to_prob(path.weight) - 0.125).abs() < 1e-12);
        // 4 skeleton nodes minus 2 placeholders plus 3 + 3 donor nodes
        assert_eq!(ab.num_nodes(), 8);
    }

    #[test]
    fn test_union_offers_both() {
        let a = single("a", 5, 0.5);
        let b = single("b", 6, 0.25);
        let mut either = union(&a, &b).unwrap();
        let fb = compute_forward_backward(&mut either, 1.0);
        assert!((log_p_to_prob(fb.total) - 0.75).abs() < 1e-12);
        let path = best_path(&either).unwrap();
        assert_eq!(words_on(&either, &path.nodes), vec![5]);
    }

    #[test]
    fn test_operands_are_not_modified() {
        let a = single("a", 5, 0.5);
        let b = single("b", 6, 0.25);
        let _ = concatenate(&a, &b).unwrap();
        assert_eq!(a.num_nodes(), 3);
        assert_eq!(b.word(1), Some(Some(6)));
    }
}
