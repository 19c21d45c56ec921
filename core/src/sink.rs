use crate::methods::{ComparisonContainer, Method};
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Append-only collection of finished pairs shared by all workers.
#[derive(Debug, Default)]
pub struct ResultSink {
    records: Mutex<Vec<ComparisonContainer>>,
}

impl ResultSink {
    pub fn with_capacity(capacity: usize) -> Self { Self { records: Mutex::new(Vec::with_capacity(capacity)) } }

    pub fn publish(&self, record: ComparisonContainer) { self.records.lock().push(record); }

    pub fn len(&self) -> usize { self.records.lock().len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Publication order depends on thread interleaving; flush in `(title_a, title_b)` order.
    pub fn into_sorted(self) -> Vec<ComparisonContainer> {
        let mut records = self.records.into_inner();
        records.sort_by(|x, y| (&x.title_a, &x.title_b).cmp(&(&y.title_a, &y.title_b)));
        records
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A document could not be extracted and was dropped.
    Extraction,
    /// A pair could not be scored and was omitted.
    Comparison,
    /// Scoring a pair panicked; the pair was omitted.
    WorkerPanic,
}

/// A recoverable fault recorded during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub title_a: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_b: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<Method>,
    pub message: String,
}

impl Diagnostic {
    pub fn extraction(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self { kind: DiagnosticKind::Extraction, title_a: title.into(), title_b: None, method: None, message: message.into() }
    }

    pub fn comparison(title_a: impl Into<String>, title_b: impl Into<String>, method: Method, message: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::Comparison,
            title_a: title_a.into(),
            title_b: Some(title_b.into()),
            method: Some(method),
            message: message.into(),
        }
    }

    pub fn worker_panic(title_a: impl Into<String>, title_b: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::WorkerPanic,
            title_a: title_a.into(),
            title_b: Some(title_b.into()),
            method: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.title_a)?;
        if let Some(b) = &self.title_b {
            write!(f, " vs {b}")?;
        }
        if let Some(m) = self.method {
            write!(f, " ({m})")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Bounded append-only diagnostic list. Records beyond the limit are counted, not kept.
#[derive(Debug)]
pub struct DiagnosticSink {
    records: Mutex<Vec<Diagnostic>>,
    limit: usize,
    dropped: AtomicUsize,
}

impl DiagnosticSink {
    pub fn new(limit: usize) -> Self { Self { records: Mutex::new(Vec::new()), limit, dropped: AtomicUsize::new(0) } }

    pub fn record(&self, diagnostic: Diagnostic) {
        tracing::debug!(%diagnostic, "recorded diagnostic");
        let mut records = self.records.lock();
        if records.len() < self.limit {
            records.push(diagnostic);
        } else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn len(&self) -> usize { self.records.lock().len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    pub fn dropped(&self) -> usize { self.dropped.load(Ordering::Relaxed) }

    pub fn into_vec(self) -> Vec<Diagnostic> { self.records.into_inner() }
}

impl Default for DiagnosticSink {
    fn default() -> Self { Self::new(10_000) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn results_flush_sorted() {
        let sink = ResultSink::default();
        sink.publish(ComparisonContainer::new("c", "b"));
        sink.publish(ComparisonContainer::new("a", "c"));
        sink.publish(ComparisonContainer::new("a", "b"));
        let titles: Vec<(String, String)> = sink.into_sorted().into_iter().map(|c| (c.title_a, c.title_b)).collect();
        assert_eq!(titles, vec![("a".into(), "b".into()), ("a".into(), "c".into()), ("b".into(), "c".into())]);
    }

    #[test]
    fn diagnostics_are_bounded() {
        let sink = DiagnosticSink::new(2);
        for i in 0..5 {
            sink.record(Diagnostic::extraction(format!("{i}.txt"), "boom"));
        }
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.dropped(), 3);
        assert_eq!(sink.into_vec()[1].title_a, "1.txt");
    }

    #[test]
    fn diagnostic_display_carries_context() {
        let d = Diagnostic::comparison("a.txt", "b.txt", Method::Random, "bad score");
        assert_eq!(d.to_string(), "[Comparison] a.txt vs b.txt (RANDOM): bad score");
    }
}
