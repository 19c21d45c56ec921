use crate::graph::{NGramParams, WordParams};
use crate::methods::{ComparisonContainer, ScoreKey};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub created_at: String,
    pub version: u32,
    pub seed: u64,
    pub methods: Vec<String>,
    pub placeholders: Vec<String>,
    pub columns: Vec<String>,
    pub top_terms: Option<usize>,
    pub cache_graphs: bool,
    pub workers: usize,
    pub ngram: NGramParams,
    pub word: WordParams,
    pub documents: usize,
    pub pairs: usize,
    pub diagnostics: usize,
    /// Phase name -> seconds.
    pub timings: BTreeMap<String, f64>,
}

pub struct OutputPaths {
    pub csv: PathBuf,
}

impl OutputPaths {
    pub fn new<P: AsRef<Path>>(csv: P) -> Self {
        Self { csv: csv.as_ref().to_path_buf() }
    }
    /// Sidecar next to the CSV: `<csv>.manifest.json`.
    pub fn manifest(&self) -> PathBuf {
        let mut name = self.csv.as_os_str().to_os_string();
        name.push(".manifest.json");
        PathBuf::from(name)
    }
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        create_dir_all(dir)?;
    }
    Ok(())
}

pub fn save_csv(path: &Path, columns: &[ScoreKey], comparisons: &[ComparisonContainer]) -> Result<()> {
    create_parent(path)?;
    let f = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut out = BufWriter::new(f);
    write_csv(&mut out, columns, comparisons)?;
    out.flush()?;
    Ok(())
}

/// Header `titleA,titleB,<column>...`, then one row per pair with six-decimal scores.
pub fn write_csv<W: Write>(out: &mut W, columns: &[ScoreKey], comparisons: &[ComparisonContainer]) -> Result<()> {
    let mut header = vec![Cow::Borrowed("titleA"), Cow::Borrowed("titleB")];
    header.extend(columns.iter().map(|c| Cow::Owned(csv_field(&c.to_string()).into_owned())));
    writeln!(out, "{}", header.join(","))?;
    for c in comparisons {
        let mut row = vec![csv_field(&c.title_a), csv_field(&c.title_b)];
        for column in columns {
            // a pair is published with all of its scores, a gap means an unknown column
            row.push(c.score(column).map(|s| Cow::Owned(format!("{s:.6}"))).unwrap_or(Cow::Borrowed("")));
        }
        writeln!(out, "{}", row.join(","))?;
    }
    Ok(())
}

fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

/// ELKI distance file: `i j distance` per pair, indices in load order, `distance = 1 - score`.
pub fn save_elki(path: &Path, column: &ScoreKey, comparisons: &[ComparisonContainer], index_of: &HashMap<&str, usize>) -> Result<()> {
    create_parent(path)?;
    let mut out = BufWriter::new(File::create(path).with_context(|| format!("creating {}", path.display()))?);
    for c in comparisons {
        let (Some(score), Some(&i), Some(&j)) = (c.score(column), index_of.get(c.title_a.as_str()), index_of.get(c.title_b.as_str())) else {
            continue;
        };
        let (i, j) = if i <= j { (i, j) } else { (j, i) };
        writeln!(out, "{i} {j} {:.6}", 1.0 - score)?;
    }
    out.flush()?;
    Ok(())
}

pub fn save_manifest(paths: &OutputPaths, manifest: &RunManifest) -> Result<()> {
    let path = paths.manifest();
    create_parent(&path)?;
    let mut f = File::create(&path)?;
    let json = serde_json::to_string_pretty(manifest)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_manifest(paths: &OutputPaths) -> Result<RunManifest> {
    let mut f = File::open(paths.manifest())?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let manifest: RunManifest = serde_json::from_str(&buf)?;
    Ok(manifest)
}

/// Find a score column by its CSV header name.
pub fn column_by_name<'a>(columns: &'a [ScoreKey], name: &str) -> Result<&'a ScoreKey> {
    columns
        .iter()
        .find(|c| c.to_string().eq_ignore_ascii_case(name))
        .ok_or_else(|| anyhow!("no score column named {name}"))
}

pub fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc().format(&time::format_description::well_known::Rfc3339).unwrap_or_default()
}
