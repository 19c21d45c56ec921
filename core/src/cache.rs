use crate::config::CompareConfig;
use crate::document::TextEntities;
use crate::graph::DocumentGraph;
use crate::methods::{Method, ScoreKey};
use crate::transform::RandomWords;
use anyhow::{anyhow, Result};
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

/// Graphs of one document for every enabled method.
///
/// `precompute` fills the cache once; afterwards the cache is only read. Accessors return the
/// cached graph, or build it on the fly without storing it, so concurrent readers never
/// mutate shared state.
#[derive(Debug)]
pub struct GraphCache<'a> {
    doc: &'a TextEntities,
    top_terms: HashSet<String>,
    config: &'a CompareConfig,
    words: &'a RandomWords,
    ngram: Option<DocumentGraph>,
    word: Option<DocumentGraph>,
    placeholder: HashMap<String, DocumentGraph>,
    placeholder_ss: HashMap<String, DocumentGraph>,
    random: Option<DocumentGraph>,
}

impl<'a> GraphCache<'a> {
    pub fn new(doc: &'a TextEntities, top_terms: HashSet<String>, config: &'a CompareConfig, words: &'a RandomWords) -> Self {
        Self {
            doc,
            top_terms,
            config,
            words,
            ngram: None,
            word: None,
            placeholder: HashMap::new(),
            placeholder_ss: HashMap::new(),
            random: None,
        }
    }

    pub fn title(&self) -> &str { &self.doc.title }

    pub fn document(&self) -> &TextEntities { self.doc }

    /// Build and keep every graph the enabled methods need. Takes a lot of memory on large corpora.
    pub fn precompute(&mut self, placeholders: &[String]) {
        let methods = self.config.methods;
        if methods.is_enabled(Method::NGrams) {
            self.ngram = Some(self.build_ngram());
        }
        if methods.is_enabled(Method::WordGraphs) {
            self.word = Some(self.build_word());
        }
        for ph in placeholders {
            if methods.is_enabled(Method::Placeholder) {
                let g = self.build_placeholder(ph);
                self.placeholder.insert(ph.clone(), g);
            }
            if methods.is_enabled(Method::PlaceholderSameSize) {
                let g = self.build_placeholder_ss(ph);
                self.placeholder_ss.insert(ph.clone(), g);
            }
        }
        if methods.is_enabled(Method::Random) {
            self.random = Some(self.build_random());
        }
    }

    pub fn cached_graphs(&self) -> usize {
        [&self.ngram, &self.word, &self.random].iter().filter(|g| g.is_some()).count()
            + self.placeholder.len()
            + self.placeholder_ss.len()
    }

    pub fn ngram(&self) -> Cow<'_, DocumentGraph> {
        self.ngram.as_ref().map_or_else(|| Cow::Owned(self.build_ngram()), Cow::Borrowed)
    }

    pub fn word(&self) -> Cow<'_, DocumentGraph> {
        self.word.as_ref().map_or_else(|| Cow::Owned(self.build_word()), Cow::Borrowed)
    }

    pub fn placeholder(&self, ph: &str) -> Cow<'_, DocumentGraph> {
        self.placeholder.get(ph).map_or_else(|| Cow::Owned(self.build_placeholder(ph)), Cow::Borrowed)
    }

    pub fn placeholder_same_size(&self, ph: &str) -> Cow<'_, DocumentGraph> {
        self.placeholder_ss.get(ph).map_or_else(|| Cow::Owned(self.build_placeholder_ss(ph)), Cow::Borrowed)
    }

    pub fn random(&self) -> Cow<'_, DocumentGraph> {
        self.random.as_ref().map_or_else(|| Cow::Owned(self.build_random()), Cow::Borrowed)
    }

    /// The graph behind one score column.
    pub fn graph(&self, key: &ScoreKey) -> Result<Cow<'_, DocumentGraph>> {
        let placeholder = || key.placeholder.as_deref().ok_or_else(|| anyhow!("{} needs a placeholder", key.method));
        Ok(match key.method {
            Method::NGrams => self.ngram(),
            Method::WordGraphs => self.word(),
            Method::Placeholder => self.placeholder(placeholder()?),
            Method::PlaceholderSameSize => self.placeholder_same_size(placeholder()?),
            Method::Random => self.random(),
        })
    }

    fn build_ngram(&self) -> DocumentGraph { DocumentGraph::ngram(&self.doc.text, &self.config.graph.ngram) }

    fn build_word(&self) -> DocumentGraph { DocumentGraph::words(&self.doc.text, &self.config.graph.word) }

    fn build_placeholder(&self, ph: &str) -> DocumentGraph {
        let top = (!self.top_terms.is_empty()).then_some(&self.top_terms);
        DocumentGraph::words(&self.doc.text_with_placeholders(ph, top), &self.config.graph.word)
    }

    fn build_placeholder_ss(&self, ph: &str) -> DocumentGraph {
        DocumentGraph::words(&self.doc.text_with_placeholder_same_size(ph), &self.config.graph.word)
    }

    fn build_random(&self) -> DocumentGraph {
        DocumentGraph::words(&self.doc.text_with_random_words(self.words), &self.config.graph.word)
    }
}
