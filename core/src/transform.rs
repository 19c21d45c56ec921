//! Obfuscated views of a document. Every view copies the text between entity
//! spans verbatim and rewrites only the spans, in text order.

use crate::document::TextEntities;
use crate::tokenizer::normalize_token;
use anyhow::{bail, Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::Path;

/// Byte range of a resolved entity occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    /// Length in characters, which is how entity lengths are counted.
    fn char_len(&self, text: &str) -> usize { text[self.start..self.end].chars().count() }
}

/// Resolve the entity list of a document into non-overlapping byte spans sorted by position.
///
/// Entities carrying an in-range character offset are placed there. The rest are located by
/// searching for their name after the previous occurrence of the same name. Spans are trimmed
/// of surrounding whitespace; overlaps keep the longest span, then the earliest.
pub fn entity_spans(doc: &TextEntities) -> Vec<Span> {
    let text = doc.text.as_str();
    let char_starts: Vec<usize> = text.char_indices().map(|(b, _)| b).chain(std::iter::once(text.len())).collect();
    let num_chars = char_starts.len() - 1;

    let mut cursors: HashMap<&str, usize> = HashMap::new();
    let mut candidates = Vec::with_capacity(doc.entities.len());
    for entity in &doc.entities {
        let length = entity.length.unwrap_or_else(|| entity.name.chars().count());
        let placed = match entity.offset {
            Some(offset) if length > 0 && offset.checked_add(length).is_some_and(|end| end <= num_chars) => {
                Some(Span { start: char_starts[offset], end: char_starts[offset + length] })
            }
            _ => locate_by_name(text, &entity.name, &mut cursors),
        };
        if let Some(span) = placed.and_then(|s| trim_span(text, s)) {
            candidates.push(span);
        }
    }
    resolve_overlaps(text, candidates)
}

fn locate_by_name<'a>(text: &str, name: &'a str, cursors: &mut HashMap<&'a str, usize>) -> Option<Span> {
    if name.trim().is_empty() {
        return None;
    }
    let from = cursors.get(name).copied().unwrap_or(0);
    let start = from + text.get(from..)?.find(name)?;
    let end = start + name.len();
    cursors.insert(name, end);
    Some(Span { start, end })
}

fn trim_span(text: &str, span: Span) -> Option<Span> {
    let slice = &text[span.start..span.end];
    let leading = slice.len() - slice.trim_start().len();
    let trailing = slice.len() - slice.trim_end().len();
    if leading + trailing >= slice.len() {
        return None;
    }
    Some(Span { start: span.start + leading, end: span.end - trailing })
}

fn resolve_overlaps(text: &str, mut candidates: Vec<Span>) -> Vec<Span> {
    candidates.sort_by_cached_key(|s| (Reverse(s.char_len(text)), s.start));
    // start -> end of accepted spans, which never overlap each other
    let mut accepted: BTreeMap<usize, usize> = BTreeMap::new();
    for span in candidates {
        let clashes = accepted.range(..span.end).next_back().is_some_and(|(_, &end)| end > span.start);
        if !clashes {
            accepted.insert(span.start, span.end);
        }
    }
    accepted.into_iter().map(|(start, end)| Span { start, end }).collect()
}

impl TextEntities {
    fn rewrite_spans(&self, mut rewrite: impl FnMut(&str, &mut String)) -> String {
        let spans = entity_spans(self);
        if spans.is_empty() {
            return self.text.clone();
        }
        let mut out = String::with_capacity(self.text.len());
        let mut cursor = 0;
        for span in spans {
            out.push_str(&self.text[cursor..span.start]);
            rewrite(&self.text[span.start..span.end], &mut out);
            cursor = span.end;
        }
        out.push_str(&self.text[cursor..]);
        out
    }

    /// Replace every entity occurrence by the single token `placeholder`.
    ///
    /// With a non-empty `top_terms` set, entity tokens whose normalized form is a top term are
    /// kept verbatim and each run of the remaining tokens collapses into one placeholder.
    pub fn text_with_placeholders(&self, placeholder: &str, top_terms: Option<&HashSet<String>>) -> String {
        let keep = top_terms.filter(|t| !t.is_empty());
        self.rewrite_spans(|surface, out| {
            let Some(keep) = keep else {
                out.push_str(placeholder);
                return;
            };
            let mut pieces: Vec<&str> = Vec::new();
            let mut in_run = false;
            for token in surface.split_whitespace() {
                if normalize_token(token).is_some_and(|t| keep.contains(&t)) {
                    pieces.push(token);
                    in_run = false;
                } else if !in_run {
                    pieces.push(placeholder);
                    in_run = true;
                }
            }
            out.push_str(&pieces.join(" "));
        })
    }

    /// Replace every entity occurrence by `placeholder` repeated once per whitespace token of
    /// the entity, so the document keeps its word count.
    pub fn text_with_placeholder_same_size(&self, placeholder: &str) -> String {
        self.rewrite_spans(|surface, out| {
            let count = surface.split_whitespace().count();
            out.push_str(&vec![placeholder; count].join(" "));
        })
    }

    /// Replace every entity occurrence by a dictionary word fixed per surface form.
    pub fn text_with_random_words(&self, words: &RandomWords) -> String {
        self.rewrite_spans(|surface, out| out.push_str(words.word_for(surface)))
    }
}

const BUILTIN_WORDS: &[&str] = &[
    "anchor", "apple", "arrow", "autumn", "badge", "basket", "beacon", "blanket", "bottle", "bridge",
    "bucket", "cabin", "candle", "canyon", "carpet", "castle", "cellar", "chair", "circle", "cliff",
    "clock", "cloud", "copper", "cotton", "crystal", "desert", "drawer", "engine", "feather", "fence",
    "field", "flame", "forest", "fountain", "garden", "glacier", "hammer", "harbor", "helmet", "island",
    "jacket", "kettle", "ladder", "lantern", "leaf", "lemon", "marble", "meadow", "mirror", "needle",
    "oak", "ocean", "orchard", "paddle", "pebble", "pencil", "pillow", "planet", "pocket", "puzzle",
    "quartz", "rabbit", "ribbon", "river", "saddle", "shadow", "shelter", "silver", "spoon", "spring",
    "staircase", "stone", "summer", "table", "thunder", "timber", "tower", "tunnel", "valley", "velvet",
    "violin", "wagon", "walnut", "window", "winter", "wool", "yard", "zephyr",
];

/// Dictionary file for the random-word view: one word per line, blank lines ignored.
pub fn read_word_list(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path).with_context(|| format!("reading dictionary {}", path.display()))?;
    Ok(content.lines().map(str::trim).filter(|l| !l.is_empty()).map(str::to_string).collect())
}

/// Word source for the random-word view. The word for a surface form depends only on the
/// run seed and the surface, so repeated occurrences map to the same word.
#[derive(Debug, Clone)]
pub struct RandomWords {
    words: Vec<String>,
    seed: u64,
}

impl RandomWords {
    pub fn new(words: Vec<String>, seed: u64) -> Result<Self> {
        let words: Vec<String> = words
            .iter()
            .filter_map(|w| w.split_whitespace().next())
            .map(str::to_string)
            .collect();
        if words.is_empty() {
            bail!("random word dictionary is empty");
        }
        Ok(Self { words, seed })
    }

    pub fn builtin(seed: u64) -> Self {
        Self { words: BUILTIN_WORDS.iter().map(|w| w.to_string()).collect(), seed }
    }

    pub fn len(&self) -> usize { self.words.len() }

    pub fn is_empty(&self) -> bool { self.words.is_empty() }

    pub fn word_for(&self, surface: &str) -> &str {
        let mut rng = StdRng::seed_from_u64(self.seed ^ fnv1a(surface.as_bytes()));
        &self.words[rng.gen_range(0..self.words.len())]
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for b in bytes {
        hash ^= u64::from(*b);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Entity;

    fn doc(text: &str, entities: Vec<Entity>) -> TextEntities { TextEntities::new("d", text, entities) }

    #[test]
    fn placeholder_replaces_each_occurrence() {
        let d = doc("Alice met Bob in Paris.", vec![
            Entity::new("Alice", "Person").at(0, 5),
            Entity::new("Bob", "Person").at(10, 3),
            Entity::new("Paris", "City").at(17, 5),
        ]);
        assert_eq!(d.text_with_placeholders("A", None), "A met A in A.");
    }

    #[test]
    fn entities_without_offsets_are_located_in_order() {
        let d = doc("Bob saw Bob and Bob.", vec![
            Entity::new("Bob", "Person"),
            Entity::new("Bob", "Person"),
        ]);
        // only two occurrences were reported, the third stays
        assert_eq!(d.text_with_placeholders("X", None), "X saw X and Bob.");
    }

    #[test]
    fn overlaps_keep_longest_then_earliest() {
        let d = doc("New York City is big", vec![
            Entity::new("York", "City").at(4, 4),
            Entity::new("New York City", "City").at(0, 13),
            Entity::new("New York", "City").at(0, 8),
        ]);
        let spans = entity_spans(&d);
        assert_eq!(spans, vec![Span { start: 0, end: 13 }]);
        assert_eq!(d.text_with_placeholder_same_size("A"), "A A A is big");
    }

    #[test]
    fn equal_length_overlaps_keep_earliest() {
        let d = doc("abcdef", vec![Entity::new("cde", "X").at(2, 3), Entity::new("bcd", "X").at(1, 3)]);
        assert_eq!(entity_spans(&d), vec![Span { start: 1, end: 4 }]);
    }

    #[test]
    fn offsets_count_characters() {
        let d = doc("Café Zoë opened", vec![Entity::new("Zoë", "Person").at(5, 3)]);
        assert_eq!(d.text_with_placeholders("P", None), "Café P opened");
    }

    #[test]
    fn spans_are_trimmed() {
        let d = doc("met Bob today", vec![Entity::new(" Bob ", "Person").at(3, 5)]);
        assert_eq!(d.text_with_placeholders("A", None), "met A today");
    }

    #[test]
    fn top_terms_are_retained_inside_entities() {
        let d = doc("The Bank of England said", vec![Entity::new("Bank of England", "Org").at(4, 15)]);
        let top: HashSet<String> = ["england".to_string()].into_iter().collect();
        assert_eq!(d.text_with_placeholders("A", Some(&top)), "The A England said");
        let empty = HashSet::new();
        assert_eq!(d.text_with_placeholders("A", Some(&empty)), "The A said");
    }

    #[test]
    fn same_size_preserves_word_count() {
        let d = doc("Dr. John Ronald Tolkien wrote in Oxford-based rooms", vec![
            Entity::new("John Ronald Tolkien", "Person").at(4, 19),
            Entity::new("Oxford", "City").at(33, 6),
        ]);
        let out = d.text_with_placeholder_same_size("PH");
        assert_eq!(out, "Dr. PH PH PH wrote in PH-based rooms");
        assert_eq!(out.split_whitespace().count(), d.word_count());
    }

    #[test]
    fn random_words_are_stable_per_surface() {
        let words = RandomWords::builtin(7);
        let d = doc("Bob and Bob and Alice", vec![
            Entity::new("Bob", "Person").at(0, 3),
            Entity::new("Bob", "Person").at(8, 3),
            Entity::new("Alice", "Person").at(16, 5),
        ]);
        let out = d.text_with_random_words(&words);
        let tokens: Vec<&str> = out.split_whitespace().collect();
        assert_eq!(tokens[0], tokens[2]);
        assert_eq!(tokens[0], words.word_for("Bob"));
        assert_eq!(out, d.text_with_random_words(&RandomWords::builtin(7)));
    }

    #[test]
    fn no_entities_means_original_text() {
        let d = doc("Nothing to hide here.", vec![]);
        let words = RandomWords::builtin(1);
        assert_eq!(d.text_with_placeholders("A", None), d.text);
        assert_eq!(d.text_with_placeholder_same_size("A"), d.text);
        assert_eq!(d.text_with_random_words(&words), d.text);
    }

    #[test]
    fn empty_dictionary_is_rejected() {
        assert!(RandomWords::new(vec!["".into(), "   ".into()], 0).is_err());
    }

    #[test]
    fn word_list_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("words.txt");
        fs::write(&path, "apple\n\n  pear \n").unwrap();
        let words = read_word_list(&path).unwrap();
        assert_eq!(words, vec!["apple", "pear"]);
        assert_eq!(RandomWords::new(words, 0).unwrap().len(), 2);
    }

    #[test]
    fn equal_character_length_overlaps_keep_the_earliest() {
        // both spans are two characters, "éé" is more bytes than "xé"
        let d = doc("xéé end", vec![Entity::new("éé", "Thing").at(1, 2), Entity::new("xé", "Thing").at(0, 2)]);
        assert_eq!(d.text_with_placeholders("A", None), "Aé end");
    }

    #[test]
    fn offset_overflow_falls_back_to_name_search() {
        let d = doc("Alice left.", vec![Entity::new("Alice", "Person").at(usize::MAX, 5)]);
        assert_eq!(d.text_with_placeholders("A", None), "A left.");
    }
}
