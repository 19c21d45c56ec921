pub mod cache;
pub mod cluster;
pub mod config;
pub mod document;
pub mod evaluate;
pub mod export;
pub mod extract;
pub mod graph;
pub mod methods;
pub mod schedule;
pub mod sink;
pub mod tfidf;
pub mod tokenizer;
pub mod transform;

pub use cache::GraphCache;
pub use cluster::Cluster;
pub use config::CompareConfig;
pub use document::{Entity, TextEntities};
pub use extract::{EntityExtractor, GazetteerExtractor};
pub use graph::{DocumentGraph, GraphParams, NGramParams, WordParams};
pub use methods::{ComparisonContainer, Method, MethodSet, ScoreKey};
pub use sink::{Diagnostic, DiagnosticKind, DiagnosticSink, ResultSink};
pub use tfidf::{TermRanking, TfIdf};
pub use transform::RandomWords;
