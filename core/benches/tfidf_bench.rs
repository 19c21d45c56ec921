use criterion::{criterion_group, criterion_main, Criterion};
use neg_core::{TextEntities, TfIdf};

fn corpus(docs: usize) -> Vec<TextEntities> {
    let vocab = ["graph", "entity", "alice", "paris", "market", "river", "signal", "harbor", "winter", "engine", "report", "meeting"];
    (0..docs)
        .map(|d| {
            let text: Vec<&str> = (0..400).map(|i| vocab[(i * 7 + d * 13 + i / 5) % vocab.len()]).collect();
            TextEntities::new(format!("{d}.txt"), text.join(" "), vec![])
        })
        .collect()
}

fn bench_tfidf(c: &mut Criterion) {
    let texts = corpus(200);
    c.bench_function("tfidf_200_docs", |b| b.iter(|| TfIdf::compute(&texts)));
}

criterion_group!(benches, bench_tfidf);
criterion_main!(benches);
