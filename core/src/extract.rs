use crate::document::{Entity, TextEntities};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Turns one input file into a document with its entities.
///
/// Failures are per document: the orchestrator drops the file and records a diagnostic.
pub trait EntityExtractor: Send + Sync {
    fn get_entities(&self, path: &Path) -> Result<TextEntities>;
}

/// Document title for a file: its file name.
pub fn title_for(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| path.display().to_string())
}

/// Read a UTF-8 document, returning its title and text.
pub fn read_document(path: &Path) -> Result<(String, String)> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok((title_for(path), text))
}

/// Offline extractor matching a fixed list of names as whole words.
#[derive(Debug, Clone, Default)]
pub struct GazetteerExtractor {
    /// (type, name)
    entries: Vec<(String, String)>,
}

impl GazetteerExtractor {
    pub fn new<I, K, N>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, N)>,
        K: Into<String>,
        N: Into<String>,
    {
        let entries = entries
            .into_iter()
            .map(|(k, n)| (k.into(), n.into()))
            .filter(|(_, n)| !n.trim().is_empty())
            .collect();
        Self { entries }
    }

    /// One entry per line, either `name` or `type<TAB>name`. Blank lines and `#` comments are skipped.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).with_context(|| format!("reading gazetteer {}", path.display()))?;
        let mut entries = Vec::new();
        for line in content.lines() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() || line.starts_with('#') { continue; }
            match line.split_once('\t') {
                Some((kind, name)) => entries.push((kind.trim().to_string(), name.trim().to_string())),
                None => entries.push(("Entity".to_string(), line.trim().to_string())),
            }
        }
        Ok(Self::new(entries))
    }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// All whole-word occurrences of every entry, in order of occurrence. Overlapping matches
    /// of different entries are all reported.
    pub fn find_entities(&self, text: &str) -> Vec<Entity> {
        let char_starts: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
        let char_index = |byte: usize| char_starts.binary_search(&byte).unwrap_or_else(|i| i);

        let mut found: Vec<(usize, usize, Entity)> = Vec::new();
        for (order, (kind, name)) in self.entries.iter().enumerate() {
            for (start, matched) in text.match_indices(name.as_str()) {
                let end = start + matched.len();
                let before = text[..start].chars().next_back();
                let after = text[end..].chars().next();
                if before.is_some_and(char::is_alphanumeric) || after.is_some_and(char::is_alphanumeric) {
                    continue;
                }
                let entity = Entity::new(name.clone(), kind.clone()).at(char_index(start), name.chars().count());
                found.push((start, order, entity));
            }
        }
        found.sort_by_key(|(start, order, _)| (*start, *order));
        found.into_iter().map(|(_, _, e)| e).collect()
    }
}

impl EntityExtractor for GazetteerExtractor {
    fn get_entities(&self, path: &Path) -> Result<TextEntities> {
        let (title, text) = read_document(path)?;
        let entities = self.find_entities(&text);
        Ok(TextEntities::new(title, text, entities))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_whole_words_in_order() {
        let g = GazetteerExtractor::new([("Person", "Bob"), ("City", "Paris"), ("Person", "Alice")]);
        let found = g.find_entities("Alice met Bob in Paris, not Bobby.");
        let names: Vec<&str> = found.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Alice", "Bob", "Paris"]);
        assert_eq!(found[1].offset, Some(10));
        assert_eq!(found[2].kind, "City");
    }

    #[test]
    fn offsets_are_in_characters() {
        let g = GazetteerExtractor::new([("Person", "Zoë")]);
        let found = g.find_entities("Café Zoë");
        assert_eq!(found[0].offset, Some(5));
        assert_eq!(found[0].length, Some(3));
    }

    #[test]
    fn reads_tab_separated_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("names.tsv");
        fs::write(&path, "# people\nPerson\tAlice\nParis\n\n").unwrap();
        let g = GazetteerExtractor::from_file(&path).unwrap();
        assert_eq!(g.len(), 2);
        let found = g.find_entities("Paris and Alice");
        assert_eq!(found[0].kind, "Entity");
        assert_eq!(found[1].kind, "Person");
    }
}
