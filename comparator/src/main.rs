use anyhow::{anyhow, Context, Result};
use clap::Parser;
use comparator::{run, write_outputs, OutputOptions};
use extractor::{CachedResponseExtractor, CalaisClient, CalaisExtractor, CALAIS_URL};
use neg_core::config::{default_workers, CompareConfig};
use neg_core::transform::read_word_list;
use neg_core::{EntityExtractor, GazetteerExtractor, Method, MethodSet};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "text-comparator")]
#[command(about = "Score every document pair of a directory with entity-aware graph similarity", long_about = None)]
struct Cli {
    /// Directory with one document per file
    #[arg(long)]
    input: PathBuf,
    /// CSV output path; the manifest is written next to it
    #[arg(long, default_value = "out.csv")]
    output: PathBuf,
    /// Comparison methods, comma separated
    #[arg(long, value_delimiter = ',', default_values_t = Method::ALL)]
    methods: Vec<Method>,
    /// Placeholder token for the placeholder methods, repeatable
    #[arg(long = "placeholder", default_values_t = ["A".to_string()])]
    placeholders: Vec<String>,
    /// Comparison threads (default: CPU count)
    #[arg(long)]
    workers: Option<usize>,
    /// Build graphs on demand for every pair instead of caching them
    #[arg(long, default_value_t = false)]
    no_cache_graphs: bool,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Keep this many top TF-IDF terms of a document inside entities under PLACEHOLDER
    #[arg(long)]
    top_terms: Option<usize>,
    /// Word list for RANDOM, one word per line
    #[arg(long)]
    dictionary: Option<PathBuf>,
    /// Also log at debug level to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
    /// Write an ELKI distance file
    #[arg(long)]
    elki: Option<PathBuf>,
    /// Score column for the ELKI file (default: first column)
    #[arg(long, requires = "elki")]
    elki_column: Option<String>,
    /// Offline extraction from a `[type<TAB>]name` list
    #[arg(long, conflicts_with = "responses")]
    gazetteer: Option<PathBuf>,
    /// Offline extraction from saved Calais responses
    #[arg(long)]
    responses: Option<PathBuf>,
    /// Keep live Calais responses in this directory
    #[arg(long)]
    save_responses: Option<PathBuf>,
    #[arg(long, default_value = CALAIS_URL)]
    endpoint: String,
    /// Calais request timeout seconds
    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref())?;

    let config = CompareConfig {
        methods: cli.methods.iter().copied().collect::<MethodSet>(),
        placeholders: cli.placeholders.clone(),
        workers: cli.workers.unwrap_or_else(default_workers),
        cache_graphs: !cli.no_cache_graphs,
        seed: cli.seed,
        top_terms: cli.top_terms,
        dictionary: cli.dictionary.as_deref().map(read_word_list).transpose()?,
        ..CompareConfig::default()
    };
    config.validate()?;

    let extractor = build_extractor(&cli)?;
    info!(input = %cli.input.display(), methods = ?config.columns().iter().map(|c| c.to_string()).collect::<Vec<_>>(), workers = config.workers, "starting");
    let report = run(&cli.input, &config, extractor.as_ref())?;

    let elki = match &cli.elki {
        Some(path) => {
            let column = match &cli.elki_column {
                Some(name) => name.clone(),
                None => config.columns().first().map(|c| c.to_string()).ok_or_else(|| anyhow!("no score column for ELKI"))?,
            };
            Some((path.clone(), column))
        }
        None => None,
    };
    let options = OutputOptions { csv: cli.output.clone(), elki };
    write_outputs(&report, &config, &options).with_context(|| format!("writing results to {}", cli.output.display()))?;

    info!(
        documents = report.titles.len(),
        pairs = report.comparisons.len(),
        diagnostics = report.diagnostics.len() + report.dropped_diagnostics,
        "finished"
    );
    Ok(())
}

fn build_extractor(cli: &Cli) -> Result<Box<dyn EntityExtractor>> {
    if let Some(path) = &cli.gazetteer {
        let gazetteer = GazetteerExtractor::from_file(path)?;
        info!(entries = gazetteer.len(), "using gazetteer extraction");
        return Ok(Box::new(gazetteer));
    }
    if let Some(dir) = &cli.responses {
        info!(dir = %dir.display(), "using saved Calais responses");
        return Ok(Box::new(CachedResponseExtractor::new(dir)));
    }
    let key = std::env::var("CALAIS_API_KEY").map_err(|_| anyhow!("CALAIS_API_KEY is not set; use --gazetteer or --responses for offline runs"))?;
    let client = CalaisClient::new(key, Duration::from_secs(cli.timeout_secs))?.with_endpoint(cli.endpoint.clone());
    let mut extractor = CalaisExtractor::new(client)?;
    if let Some(dir) = &cli.save_responses {
        extractor = extractor.save_responses_to(dir);
    }
    info!(endpoint = %cli.endpoint, "using live Calais extraction");
    Ok(Box::new(extractor))
}

fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));
    let file = match log_file {
        Some(path) => {
            let f = File::create(path).with_context(|| format!("creating log file {}", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(f)).with_filter(LevelFilter::DEBUG))
        }
        None => None,
    };
    tracing_subscriber::registry().with(console).with(file).init();
    Ok(())
}
