use crate::graph::GraphParams;
use crate::methods::{score_columns, Method, MethodSet, ScoreKey};
use crate::transform::RandomWords;
use anyhow::{bail, Result};
use std::collections::HashSet;
use std::thread;

/// Everything a comparison run is parameterized by. Built once, then shared read-only by the
/// orchestrator, the graph caches and the workers.
#[derive(Debug, Clone)]
pub struct CompareConfig {
    pub methods: MethodSet,
    pub placeholders: Vec<String>,
    /// Worker threads for the comparison phase.
    pub workers: usize,
    /// Materialize every graph before comparing. Off trades CPU for memory: graphs are then
    /// rebuilt for every pair.
    pub cache_graphs: bool,
    pub seed: u64,
    /// How many top TF-IDF terms of a document survive inside entities under PLACEHOLDER.
    pub top_terms: Option<usize>,
    pub graph: GraphParams,
    /// Word list for the RANDOM method; the built-in list when unset.
    pub dictionary: Option<Vec<String>>,
    pub max_diagnostics: usize,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            methods: MethodSet::all(),
            placeholders: vec!["A".to_string()],
            workers: default_workers(),
            cache_graphs: true,
            seed: 0,
            top_terms: None,
            graph: GraphParams::default(),
            dictionary: None,
            max_diagnostics: 10_000,
        }
    }
}

pub fn default_workers() -> usize { thread::available_parallelism().map(|n| n.get()).unwrap_or(1) }

impl CompareConfig {
    pub fn validate(&self) -> Result<()> {
        if self.methods.is_empty() {
            bail!("no comparison method enabled");
        }
        if self.workers == 0 {
            bail!("worker count must be at least 1");
        }
        let mut seen = HashSet::new();
        for ph in &self.placeholders {
            if ph.is_empty() || ph.chars().any(char::is_whitespace) {
                bail!("placeholder {ph:?} must be a single non-empty token");
            }
            if !seen.insert(ph) {
                bail!("placeholder {ph:?} given twice");
            }
        }
        let ng = &self.graph.ngram;
        if ng.min_n == 0 || ng.min_n > ng.max_n || ng.window == 0 || self.graph.word.window == 0 {
            bail!("invalid graph parameters {:?}", self.graph);
        }
        Ok(())
    }

    /// TF-IDF rankings are only consumed by the PLACEHOLDER method.
    pub fn needs_tfidf(&self) -> bool { self.methods.is_enabled(Method::Placeholder) }

    pub fn columns(&self) -> Vec<ScoreKey> { score_columns(&self.methods, &self.placeholders) }

    pub fn random_words(&self) -> Result<RandomWords> {
        match &self.dictionary {
            Some(words) => RandomWords::new(words.clone(), self.seed),
            None => Ok(RandomWords::builtin(self.seed)),
        }
    }
}
