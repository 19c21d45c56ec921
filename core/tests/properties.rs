use neg_core::evaluate::compare_pair;
use neg_core::{CompareConfig, GazetteerExtractor, GraphCache, Method, ScoreKey, TextEntities, TfIdf};
use std::collections::HashSet;

fn gazetteer() -> GazetteerExtractor {
    GazetteerExtractor::new([("Person", "Alice"), ("Person", "Bob"), ("City", "Paris"), ("City", "New York City")])
}

fn document(title: &str, text: &str) -> TextEntities {
    TextEntities::new(title, text, gazetteer().find_entities(text))
}

#[test]
fn same_size_view_keeps_word_count() {
    let docs = [
        document("1", "Alice met Bob in Paris."),
        document("2", "New York City is larger than Paris, Bob said to Alice."),
        document("3", "Nobody here."),
    ];
    for doc in &docs {
        for ph in ["A", "XX"] {
            let view = doc.text_with_placeholder_same_size(ph);
            assert_eq!(view.split_whitespace().count(), doc.word_count(), "{view}");
        }
    }
}

#[test]
fn duplicate_document_scores_one_everywhere() {
    let text = "Alice met Bob in Paris. Later Bob flew to New York City without Alice.";
    let docs = vec![document("d.txt", text), document("d-copy.txt", text), document("other.txt", "Paris in spring.")];
    let config = CompareConfig { top_terms: Some(3), placeholders: vec!["A".into(), "-".into()], ..Default::default() };
    let words = config.random_words().unwrap();
    let tfidf = TfIdf::compute(&docs);
    let caches: Vec<GraphCache> = docs.iter().map(|d| GraphCache::new(d, tfidf.top_terms(&d.title, 3), &config, &words)).collect();
    let columns = config.columns();
    let pair = compare_pair(&caches[0], &caches[1], &columns).unwrap();
    assert_eq!(pair.title_a, "d-copy.txt");
    for column in &columns {
        assert_eq!(pair.score(column), Some(1.0), "{column}");
    }
}

#[test]
fn documents_without_entities_match_word_graphs() {
    let docs = [TextEntities::new("x", "the cat sat on the mat", vec![]), TextEntities::new("y", "the cat lay on a rug", vec![])];
    let config = CompareConfig::default();
    let words = config.random_words().unwrap();
    let a = GraphCache::new(&docs[0], HashSet::new(), &config, &words);
    let b = GraphCache::new(&docs[1], HashSet::new(), &config, &words);
    let pair = compare_pair(&a, &b, &config.columns()).unwrap();
    let word = pair.score(&ScoreKey::new(Method::WordGraphs)).unwrap();
    assert!(word > 0.0 && word < 1.0);
    assert_eq!(pair.score(&ScoreKey::with_placeholder(Method::Placeholder, "A")), Some(word));
    assert_eq!(pair.score(&ScoreKey::with_placeholder(Method::PlaceholderSameSize, "A")), Some(word));
    assert_eq!(pair.score(&ScoreKey::new(Method::Random)), Some(word));
}
