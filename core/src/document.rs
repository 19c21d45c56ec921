use serde::{Deserialize, Serialize};

/// A named entity occurrence. `offset` and `length` count characters, not bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance: Option<f64>,
}

impl Entity {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self { name: name.into(), kind: kind.into(), offset: None, length: None, relevance: None }
    }

    pub fn at(mut self, offset: usize, length: usize) -> Self {
        self.offset = Some(offset);
        self.length = Some(length);
        self
    }

    pub fn with_relevance(mut self, relevance: f64) -> Self {
        self.relevance = Some(relevance);
        self
    }
}

/// One document after entity extraction. Treated as immutable once built:
/// graph caches and rankings are derived from it and never invalidated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextEntities {
    /// Unique within a run, usually the file name.
    pub title: String,
    pub text: String,
    /// In order of occurrence. The same entity may appear many times.
    pub entities: Vec<Entity>,
}

impl TextEntities {
    pub fn new(title: impl Into<String>, text: impl Into<String>, entities: Vec<Entity>) -> Self {
        Self { title: title.into(), text: text.into(), entities }
    }

    /// Number of whitespace separated tokens in the original text.
    pub fn word_count(&self) -> usize { self.text.split_whitespace().count() }
}
