use crate::document::TextEntities;
use crate::tokenizer::tokenize;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};

/// `(term, score)` pairs, score descending, ties broken by term.
pub type TermRanking = Vec<(String, f64)>;

/// Per-document TF-IDF rankings over one corpus.
///
/// `score = tf(t, d) * ln(N / df(t))` with raw counts for `tf` and `N` the corpus size.
#[derive(Debug, Clone, Default)]
pub struct TfIdf {
    num_docs: usize,
    rankings: HashMap<String, TermRanking>,
}

impl TfIdf {
    /// Rankings for a run where no method needs them; every lookup is empty.
    pub fn empty() -> Self { Self::default() }

    /// Two passes over the corpus. Pass 1 tokenizes each document once, keeping a per-document
    /// count snapshot, and accumulates document frequencies. Pass 2 scores the snapshots.
    pub fn compute(texts: &[TextEntities]) -> Self {
        let snapshots: Vec<HashMap<String, u32>> = texts.par_iter().map(|t| term_counts(&t.text)).collect();

        let mut df: HashMap<&str, u32> = HashMap::new();
        for counts in &snapshots {
            for term in counts.keys() {
                *df.entry(term.as_str()).or_insert(0) += 1;
            }
        }

        let n = texts.len();
        let rankings = texts
            .iter()
            .zip(&snapshots)
            .map(|(doc, counts)| {
                let ranking = counts
                    .iter()
                    .map(|(term, &tf)| (term.clone(), score(tf, df[term.as_str()], n)))
                    .collect();
                (doc.title.clone(), sorted(ranking))
            })
            .collect();
        Self { num_docs: n, rankings }
    }

    /// Re-tokenizes the whole corpus for every term of every document.
    #[cfg(test)]
    pub(crate) fn compute_naive(texts: &[TextEntities]) -> Self {
        let n = texts.len();
        let mut rankings = HashMap::new();
        for doc in texts {
            let counts = term_counts(&doc.text);
            let mut ranking = Vec::with_capacity(counts.len());
            for (term, tf) in counts {
                let df = texts.iter().filter(|other| tokenize(&other.text).contains(&term)).count() as u32;
                let s = score(tf, df, n);
                ranking.push((term, s));
            }
            rankings.insert(doc.title.clone(), sorted(ranking));
        }
        Self { num_docs: n, rankings }
    }

    pub fn num_docs(&self) -> usize { self.num_docs }

    pub fn is_empty(&self) -> bool { self.rankings.is_empty() }

    /// Sorted ranking of a document; empty when the title is unknown or TF-IDF was skipped.
    pub fn ranking(&self, title: &str) -> &[(String, f64)] {
        self.rankings.get(title).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The `k` highest ranked terms of a document.
    pub fn top_terms(&self, title: &str, k: usize) -> HashSet<String> {
        self.ranking(title).iter().take(k).map(|(term, _)| term.clone()).collect()
    }

    pub fn distinct_terms(&self) -> usize {
        self.rankings.values().flatten().map(|(t, _)| t.as_str()).collect::<HashSet<_>>().len()
    }
}

fn term_counts(text: &str) -> HashMap<String, u32> {
    let mut counts = HashMap::new();
    for term in tokenize(text) {
        *counts.entry(term).or_insert(0) += 1;
    }
    counts
}

fn score(tf: u32, df: u32, num_docs: usize) -> f64 {
    f64::from(tf) * (num_docs as f64 / f64::from(df)).ln()
}

fn sorted(mut ranking: TermRanking) -> TermRanking {
    ranking.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranking
}
