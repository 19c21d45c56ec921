//! Document graphs: character n-gram graphs, word graphs and their value similarity.
//!
//! Both graph kinds share one representation: a directed edge from every unit (n-gram or
//! word) to each of the next `window` units, weighted by how often the pair co-occurs.
//! Parameters are fixed for a run and recorded in the run manifest.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NGramParams {
    pub min_n: usize,
    pub max_n: usize,
    pub window: usize,
}

impl Default for NGramParams {
    fn default() -> Self { Self { min_n: 3, max_n: 3, window: 3 } }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordParams {
    pub window: usize,
}

impl Default for WordParams {
    fn default() -> Self { Self { window: 3 } }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphParams {
    pub ngram: NGramParams,
    pub word: WordParams,
}

type Edge = (Box<str>, Box<str>);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentGraph {
    edges: HashMap<Edge, f64>,
}

impl DocumentGraph {
    /// Character n-gram graph over every rank in `min_n..=max_n`.
    pub fn ngram(text: &str, params: &NGramParams) -> Self {
        let bounds: Vec<usize> = text.char_indices().map(|(b, _)| b).chain(std::iter::once(text.len())).collect();
        let num_chars = bounds.len() - 1;
        let mut counts: HashMap<(&str, &str), f64> = HashMap::new();
        for n in params.min_n.max(1)..=params.max_n {
            if n > num_chars {
                break;
            }
            let grams: Vec<&str> = (0..=num_chars - n).map(|i| &text[bounds[i]..bounds[i + n]]).collect();
            link_window(&grams, params.window, &mut counts);
        }
        Self::from_counts(counts)
    }

    /// Word graph over whitespace tokens, case preserved.
    pub fn words(text: &str, params: &WordParams) -> Self {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        let mut counts = HashMap::new();
        link_window(&tokens, params.window, &mut counts);
        Self::from_counts(counts)
    }

    fn from_counts(counts: HashMap<(&str, &str), f64>) -> Self {
        let edges = counts.into_iter().map(|((a, b), w)| ((Box::from(a), Box::from(b)), w)).collect();
        Self { edges }
    }

    pub fn edge_count(&self) -> usize { self.edges.len() }

    pub fn is_empty(&self) -> bool { self.edges.is_empty() }

    pub fn weight(&self, from: &str, to: &str) -> Option<f64> {
        self.edges.get(&(Box::from(from), Box::from(to))).copied()
    }

    /// Normalized value similarity in `[0, 1]`:
    /// `Σ min(w1, w2) / max(w1, w2)` over shared edges, divided by the larger edge count.
    ///
    /// Two empty graphs are identical (`1.0`); an empty graph shares nothing with a non-empty
    /// one (`0.0`). Shared-edge ratios are summed in sorted order, so the result does not depend
    /// on argument order or map iteration order.
    pub fn value_similarity(&self, other: &DocumentGraph) -> f64 {
        match (self.is_empty(), other.is_empty()) {
            (true, true) => return 1.0,
            (true, false) | (false, true) => return 0.0,
            _ => {}
        }
        let (small, large) = if self.edges.len() <= other.edges.len() { (self, other) } else { (other, self) };
        let mut ratios: Vec<f64> = small
            .edges
            .iter()
            .filter_map(|(edge, &w)| large.edges.get(edge).map(|&v| w.min(v) / w.max(v)))
            .collect();
        ratios.sort_by(f64::total_cmp);
        let overlap: f64 = ratios.iter().sum();
        overlap / large.edges.len() as f64
    }
}

fn link_window<'a>(units: &[&'a str], window: usize, counts: &mut HashMap<(&'a str, &'a str), f64>) {
    for (i, &from) in units.iter().enumerate() {
        for &to in units.iter().skip(i + 1).take(window) {
            *counts.entry((from, to)).or_insert(0.0) += 1.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_graph_links_within_window() {
        let g = DocumentGraph::words("a b c d e", &WordParams { window: 2 });
        assert_eq!(g.weight("a", "b"), Some(1.0));
        assert_eq!(g.weight("a", "c"), Some(1.0));
        assert_eq!(g.weight("a", "d"), None);
        assert_eq!(g.weight("b", "a"), None);
        assert_eq!(g.edge_count(), 7);
    }

    #[test]
    fn repeated_pairs_accumulate_weight() {
        let g = DocumentGraph::words("x y x y", &WordParams { window: 1 });
        assert_eq!(g.weight("x", "y"), Some(2.0));
        assert_eq!(g.weight("y", "x"), Some(1.0));
    }

    #[test]
    fn ngram_graph_uses_characters() {
        let g = DocumentGraph::ngram("abcde", &NGramParams { min_n: 3, max_n: 3, window: 1 });
        assert_eq!(g.weight("abc", "bcd"), Some(1.0));
        assert_eq!(g.weight("bcd", "cde"), Some(1.0));
        assert_eq!(g.edge_count(), 2);
        let short = DocumentGraph::ngram("ab", &NGramParams::default());
        assert!(short.is_empty());
        let multibyte = DocumentGraph::ngram("żółw", &NGramParams { min_n: 3, max_n: 3, window: 1 });
        assert_eq!(multibyte.weight("żół", "ółw"), Some(1.0));
    }

    #[test]
    fn similarity_laws() {
        let params = WordParams::default();
        let a = DocumentGraph::words("Alice went home.", &params);
        let b = DocumentGraph::words("Bob went home.", &params);
        let empty = DocumentGraph::words("", &params);
        assert_eq!(a.value_similarity(&a), 1.0);
        assert_eq!(a.value_similarity(&empty), 0.0);
        assert_eq!(empty.value_similarity(&a), 0.0);
        assert_eq!(empty.value_similarity(&empty), 1.0);
        let ab = a.value_similarity(&b);
        assert_eq!(ab.to_bits(), b.value_similarity(&a).to_bits());
        // only went -> home. is shared out of three edges each
        assert!((ab - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn weights_enter_as_min_over_max() {
        let p = WordParams { window: 1 };
        let a = DocumentGraph::words("x y x y", &p);
        let b = DocumentGraph::words("x y", &p);
        // shared x -> y with weights 2 and 1; a has two edges
        assert!((a.value_similarity(&b) - 0.25).abs() < 1e-12);
    }
}
