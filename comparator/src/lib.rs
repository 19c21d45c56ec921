//! Comparison pipeline: extract entities, rank terms, build graphs, compare every document
//! pair, flush results. Phases run strictly one after another.

use anyhow::{bail, Context, Result};
use neg_core::config::CompareConfig;
use neg_core::evaluate::{compare_pair, PairFailure};
use neg_core::export::{self, OutputPaths, RunManifest};
use neg_core::extract::title_for;
use neg_core::schedule::{effective_workers, for_each_pair, pair_count};
use neg_core::{ComparisonContainer, Diagnostic, DiagnosticSink, EntityExtractor, GraphCache, ResultSink, TextEntities, TfIdf};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

/// Wall time of each phase. Skipped phases stay at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseTimings {
    pub extraction: Duration,
    pub tfidf: Duration,
    pub graphs: Duration,
    pub comparisons: Duration,
}

impl PhaseTimings {
    pub fn as_seconds(&self) -> BTreeMap<String, f64> {
        [
            ("extraction", self.extraction),
            ("tfidf", self.tfidf),
            ("graphs", self.graphs),
            ("comparisons", self.comparisons),
        ]
        .into_iter()
        .map(|(k, d)| (k.to_string(), d.as_secs_f64()))
        .collect()
    }
}

#[derive(Debug)]
pub struct RunReport {
    /// Documents that were compared, in load order.
    pub titles: Vec<String>,
    /// Sorted by `(title_a, title_b)`.
    pub comparisons: Vec<ComparisonContainer>,
    pub diagnostics: Vec<Diagnostic>,
    pub dropped_diagnostics: usize,
    pub tfidf: TfIdf,
    pub timings: PhaseTimings,
}

impl RunReport {
    fn new(texts: &[TextEntities], comparisons: Vec<ComparisonContainer>, diagnostics: DiagnosticSink, tfidf: TfIdf, timings: PhaseTimings) -> Self {
        let dropped_diagnostics = diagnostics.dropped();
        let diagnostics = diagnostics.into_vec();
        if !diagnostics.is_empty() {
            error!(count = diagnostics.len(), dropped = dropped_diagnostics, "errors:");
            for d in &diagnostics {
                error!("{d}");
            }
        }
        Self {
            titles: texts.iter().map(|t| t.title.clone()).collect(),
            comparisons,
            diagnostics,
            dropped_diagnostics,
            tfidf,
            timings,
        }
    }

    pub fn manifest(&self, config: &CompareConfig) -> RunManifest {
        RunManifest {
            created_at: export::now_rfc3339(),
            version: 1,
            seed: config.seed,
            methods: config.methods.iter().map(|m| m.to_string()).collect(),
            placeholders: config.placeholders.clone(),
            columns: config.columns().iter().map(|c| c.to_string()).collect(),
            top_terms: config.top_terms,
            cache_graphs: config.cache_graphs,
            workers: effective_workers(self.titles.len(), config.workers),
            ngram: config.graph.ngram,
            word: config.graph.word,
            documents: self.titles.len(),
            pairs: self.comparisons.len(),
            diagnostics: self.diagnostics.len() + self.dropped_diagnostics,
            timings: self.timings.as_seconds(),
        }
    }
}

/// Where a run writes its results.
#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub csv: PathBuf,
    /// ELKI distance file and the score column it is computed from.
    pub elki: Option<(PathBuf, String)>,
}

/// Regular files directly inside `input`, sorted by name. Failing to read `input` itself is fatal.
pub fn list_input_files(input: &Path) -> Result<Vec<PathBuf>> {
    if !input.is_dir() {
        bail!("input {} is not a directory", input.display());
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(input).min_depth(1).max_depth(1).follow_links(true).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            // broken links and unreadable entries inside the directory are skipped
            Err(err) if err.depth() > 0 => {
                warn!(path = ?err.path(), error = %err, "skipping unreadable entry");
                continue;
            }
            Err(err) => return Err(err).with_context(|| format!("listing {}", input.display())),
        };
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        } else {
            debug!(path = %entry.path().display(), "skipping non-regular entry");
        }
    }
    Ok(files)
}

/// Extract every input file. A file the extractor rejects is dropped with a diagnostic.
pub fn load_documents(input: &Path, extractor: &dyn EntityExtractor, diagnostics: &DiagnosticSink) -> Result<Vec<TextEntities>> {
    let files = list_input_files(input)?;
    info!(input = %input.display(), files = files.len(), "getting text entities");

    let total = files.len();
    let mut logged_percent = 0.0;
    let mut texts = Vec::with_capacity(total);
    for (i, path) in files.iter().enumerate() {
        let percent = 100.0 * (i + 1) as f64 / total as f64;
        if percent - logged_percent >= 10.0 || i + 1 == total {
            info!(file = i + 1, total, percent = format!("{percent:.2}"), path = %path.display(), "getting entities");
            logged_percent = percent;
        } else {
            debug!(file = i + 1, total, path = %path.display(), "getting entities");
        }

        match extractor.get_entities(path) {
            Ok(doc) => {
                debug!(title = %doc.title, entities = doc.entities.len(), "extracted");
                texts.push(doc);
            }
            Err(err) => {
                warn!(path = %path.display(), error = %format!("{err:#}"), "extraction failed, dropping document");
                diagnostics.record(Diagnostic::extraction(title_for(path), format!("{err:#}")));
            }
        }
    }
    Ok(texts)
}

/// Full run over an input directory: extraction, then the comparison phases.
pub fn run(input: &Path, config: &CompareConfig, extractor: &dyn EntityExtractor) -> Result<RunReport> {
    config.validate()?;
    let diagnostics = DiagnosticSink::new(config.max_diagnostics);

    let start = Instant::now();
    let texts = load_documents(input, extractor, &diagnostics).context("not comparing anything, extraction failed")?;
    let extraction = start.elapsed();
    info!(documents = texts.len(), elapsed_s = extraction.as_secs_f64(), "extraction phase done");

    let (comparisons, tfidf, mut timings) = compare_into(&texts, config, &diagnostics)?;
    timings.extraction = extraction;
    Ok(RunReport::new(&texts, comparisons, diagnostics, tfidf, timings))
}

/// Compare already extracted documents.
pub fn compare_documents(texts: &[TextEntities], config: &CompareConfig) -> Result<RunReport> {
    let diagnostics = DiagnosticSink::new(config.max_diagnostics);
    let (comparisons, tfidf, timings) = compare_into(texts, config, &diagnostics)?;
    Ok(RunReport::new(texts, comparisons, diagnostics, tfidf, timings))
}

fn compare_into(texts: &[TextEntities], config: &CompareConfig, diagnostics: &DiagnosticSink) -> Result<(Vec<ComparisonContainer>, TfIdf, PhaseTimings)> {
    config.validate()?;
    let mut seen = HashSet::new();
    for t in texts {
        if !seen.insert(t.title.as_str()) {
            bail!("duplicate document title {}", t.title);
        }
    }
    let words = config.random_words()?;
    let mut timings = PhaseTimings::default();

    // TF-IDF, only the placeholder method keeps top terms
    let tfidf = if config.needs_tfidf() {
        info!("calculating TF-IDF");
        let start = Instant::now();
        let tfidf = TfIdf::compute(texts);
        timings.tfidf = start.elapsed();
        tfidf
    } else {
        TfIdf::empty()
    };
    info!(elapsed_s = timings.tfidf.as_secs_f64(), terms = tfidf.distinct_terms(), "TF-IDF phase done");

    // Graphs
    let top_k = config.top_terms.unwrap_or(0);
    let mut caches: Vec<GraphCache<'_>> = texts
        .iter()
        .map(|t| GraphCache::new(t, tfidf.top_terms(&t.title, top_k), config, &words))
        .collect();
    if config.cache_graphs {
        info!("calculating graphs");
        let start = Instant::now();
        caches.par_iter_mut().for_each(|c| c.precompute(&config.placeholders));
        timings.graphs = start.elapsed();
    }
    let cached: usize = caches.iter().map(GraphCache::cached_graphs).sum();
    info!(elapsed_s = timings.graphs.as_secs_f64(), cached, "graph phase done");

    // Comparisons
    let n = texts.len();
    let total = pair_count(n);
    let workers = effective_workers(n, config.workers);
    info!(documents = n, pairs = total, workers, "starting text comparisons");

    let columns = config.columns();
    let start = Instant::now();
    let comparisons = score_pairs(texts, workers, diagnostics, |i, j| compare_pair(&caches[i], &caches[j], &columns))?;
    timings.comparisons = start.elapsed();
    info!(records = comparisons.len(), elapsed_s = timings.comparisons.as_secs_f64(), "comparison phase done");

    Ok((comparisons, tfidf, timings))
}

/// Run `score` over every pair on `workers` threads. Failed and panicking pairs become
/// diagnostics with the titles in canonical order; the rest are returned sorted.
fn score_pairs<F>(texts: &[TextEntities], workers: usize, diagnostics: &DiagnosticSink, score: F) -> Result<Vec<ComparisonContainer>>
where
    F: Fn(usize, usize) -> Result<ComparisonContainer, PairFailure> + Sync,
{
    let n = texts.len();
    let total = pair_count(n);
    let results = ResultSink::with_capacity(total);
    let done = AtomicUsize::new(0);
    let step = (total / 10).max(1);
    let panics = for_each_pair(n, workers, |i, j| {
        match score(i, j) {
            Ok(record) => results.publish(record),
            Err(failure) => {
                let (a, b) = ordered(&texts[i].title, &texts[j].title);
                diagnostics.record(Diagnostic::comparison(a, b, failure.column.method, failure.to_string()));
            }
        }
        let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
        if finished % step == 0 || finished == total {
            info!(done = finished, total, percent = format!("{:.2}", 100.0 * finished as f64 / total as f64), "progress");
        }
    })?;
    for p in panics {
        let (a, b) = ordered(&texts[p.i].title, &texts[p.j].title);
        diagnostics.record(Diagnostic::worker_panic(a, b, p.message));
    }
    Ok(results.into_sorted())
}

fn ordered<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Write the CSV, the optional ELKI distance file and the run manifest.
pub fn write_outputs(report: &RunReport, config: &CompareConfig, options: &OutputOptions) -> Result<()> {
    let columns = config.columns();
    let paths = OutputPaths::new(&options.csv);
    export::save_csv(&paths.csv, &columns, &report.comparisons)?;
    if let Some((path, name)) = &options.elki {
        let column = export::column_by_name(&columns, name)?;
        let index_of: HashMap<&str, usize> = report.titles.iter().enumerate().map(|(i, t)| (t.as_str(), i)).collect();
        export::save_elki(path, column, &report.comparisons, &index_of)?;
        info!(path = %path.display(), column = %column, "wrote ELKI distances");
    }
    export::save_manifest(&paths, &report.manifest(config))?;
    info!(csv = %paths.csv.display(), rows = report.comparisons.len(), "results written");
    Ok(())
}
