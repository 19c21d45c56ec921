use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Comparison methods, in registry order. The order fixes the CSV column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Method {
    /// Character n-gram graph of the raw text.
    NGrams,
    /// Word graph of the raw text.
    WordGraphs,
    /// Word graph after replacing each entity by one placeholder token.
    Placeholder,
    /// Word graph after replacing each entity by one placeholder per entity token.
    #[serde(rename = "PLACEHOLDER_SS")]
    PlaceholderSameSize,
    /// Word graph after replacing each distinct entity surface by a random word.
    Random,
}

impl Method {
    pub const ALL: [Method; 5] = [Method::NGrams, Method::WordGraphs, Method::Placeholder, Method::PlaceholderSameSize, Method::Random];

    pub fn name(self) -> &'static str {
        match self {
            Method::NGrams => "N_GRAMS",
            Method::WordGraphs => "WORD_GRAPHS",
            Method::Placeholder => "PLACEHOLDER",
            Method::PlaceholderSameSize => "PLACEHOLDER_SS",
            Method::Random => "RANDOM",
        }
    }

    /// Whether the method produces one score per configured placeholder.
    pub fn uses_placeholder(self) -> bool { matches!(self, Method::Placeholder | Method::PlaceholderSameSize) }

    fn bit(self) -> u8 { 1 << self as u8 }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

impl FromStr for Method {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_uppercase().replace('-', "_");
        Method::ALL
            .into_iter()
            .find(|m| m.name() == wanted)
            .ok_or_else(|| anyhow!("unknown method '{s}', expected one of N_GRAMS, WORD_GRAPHS, PLACEHOLDER, PLACEHOLDER_SS, RANDOM"))
    }
}

/// The enabled-methods table. Built once from configuration and read-only afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MethodSet {
    bits: u8,
}

impl MethodSet {
    pub fn all() -> Self { Method::ALL.into_iter().collect() }

    pub fn none() -> Self { Self::default() }

    pub fn with(mut self, method: Method) -> Self {
        self.bits |= method.bit();
        self
    }

    pub fn without(mut self, method: Method) -> Self {
        self.bits &= !method.bit();
        self
    }

    pub fn is_enabled(&self, method: Method) -> bool { self.bits & method.bit() != 0 }

    pub fn is_empty(&self) -> bool { self.bits == 0 }

    /// Enabled methods in registry order.
    pub fn iter(&self) -> impl Iterator<Item = Method> + '_ { Method::ALL.into_iter().filter(|m| self.is_enabled(*m)) }
}

impl FromIterator<Method> for MethodSet {
    fn from_iter<I: IntoIterator<Item = Method>>(iter: I) -> Self {
        iter.into_iter().fold(MethodSet::none(), MethodSet::with)
    }
}

/// Identifies one score of a pair: a method, plus the placeholder for placeholder methods.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScoreKey {
    pub method: Method,
    pub placeholder: Option<String>,
}

impl ScoreKey {
    pub fn new(method: Method) -> Self { Self { method, placeholder: None } }

    pub fn with_placeholder(method: Method, placeholder: impl Into<String>) -> Self {
        Self { method, placeholder: Some(placeholder.into()) }
    }
}

impl fmt::Display for ScoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.placeholder {
            Some(ph) => write!(f, "{}_{}", self.method, ph),
            None => write!(f, "{}", self.method),
        }
    }
}

/// Score columns for a configuration: registry order, and for placeholder methods one column
/// per placeholder in configured order.
pub fn score_columns(methods: &MethodSet, placeholders: &[String]) -> Vec<ScoreKey> {
    let mut columns = Vec::new();
    for method in methods.iter() {
        if method.uses_placeholder() {
            columns.extend(placeholders.iter().map(|ph| ScoreKey::with_placeholder(method, ph.clone())));
        } else {
            columns.push(ScoreKey::new(method));
        }
    }
    columns
}

/// All scores of one unordered document pair, stored with `title_a <= title_b`.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonContainer {
    pub title_a: String,
    pub title_b: String,
    pub scores: BTreeMap<ScoreKey, f64>,
}

impl ComparisonContainer {
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        let (a, b) = (a.into(), b.into());
        let (title_a, title_b) = if a <= b { (a, b) } else { (b, a) };
        Self { title_a, title_b, scores: BTreeMap::new() }
    }

    pub fn score(&self, key: &ScoreKey) -> Option<f64> { self.scores.get(key).copied() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_method_names() {
        assert_eq!("placeholder_ss".parse::<Method>().unwrap(), Method::PlaceholderSameSize);
        assert_eq!("word-graphs".parse::<Method>().unwrap(), Method::WordGraphs);
        assert!("bm25".parse::<Method>().is_err());
    }

    #[test]
    fn columns_follow_registry_then_placeholder_order() {
        let methods = MethodSet::all().without(Method::NGrams);
        let placeholders = vec!["A".to_string(), "-".to_string()];
        let names: Vec<String> = score_columns(&methods, &placeholders).iter().map(|k| k.to_string()).collect();
        assert_eq!(names, vec!["WORD_GRAPHS", "PLACEHOLDER_A", "PLACEHOLDER_-", "PLACEHOLDER_SS_A", "PLACEHOLDER_SS_-", "RANDOM"]);
    }

    #[test]
    fn method_set_membership() {
        let set: MethodSet = [Method::Random, Method::NGrams].into_iter().collect();
        assert!(set.is_enabled(Method::Random));
        assert!(!set.is_enabled(Method::Placeholder));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![Method::NGrams, Method::Random]);
        assert!(MethodSet::none().is_empty());
    }

    #[test]
    fn container_titles_are_canonical() {
        let c = ComparisonContainer::new("b.txt", "a.txt");
        assert_eq!(c.title_a, "a.txt");
        assert_eq!(c.title_b, "b.txt");
    }
}
