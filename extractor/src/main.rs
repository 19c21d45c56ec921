use anyhow::{anyhow, Context, Result};
use clap::Parser;
use extractor::{response_path, CalaisClient, CALAIS_URL};
use neg_core::extract::read_document;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(name = "calais-post")]
#[command(about = "Post every file of a directory to Calais and save the JSON responses")]
struct Cli {
    /// Directory with the input texts
    #[arg(long)]
    input: PathBuf,
    /// Directory receiving `<file name>.json` responses
    #[arg(long)]
    output: PathBuf,
    /// Requests in flight
    #[arg(long, default_value_t = 4)]
    concurrency: usize,
    /// Request timeout seconds
    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,
    #[arg(long, default_value = CALAIS_URL)]
    endpoint: String,
    /// Do not post files that already have a saved response
    #[arg(long, default_value_t = false)]
    skip_existing: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))).init();
    let args = Cli::parse();

    let key = std::env::var("CALAIS_API_KEY").map_err(|_| anyhow!("CALAIS_API_KEY is not set"))?;
    let client = CalaisClient::new(key, Duration::from_secs(args.timeout_secs))?.with_endpoint(args.endpoint.clone());
    fs::create_dir_all(&args.output).with_context(|| format!("creating {}", args.output.display()))?;

    let mut files = Vec::new();
    for entry in WalkDir::new(&args.input).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            info!(path = %entry.path().display(), "skipping, not a regular file");
            continue;
        }
        files.push(entry.into_path());
    }
    info!(files = files.len(), endpoint = %client.endpoint(), concurrency = args.concurrency, "posting");

    let concurrency = args.concurrency.max(1);
    let mut queue = files.into_iter();
    let mut inflight = JoinSet::new();
    let (mut saved, mut failed, mut skipped) = (0usize, 0usize, 0usize);
    loop {
        while inflight.len() < concurrency {
            let Some(path) = queue.next() else { break };
            let (title, text) = match read_document(&path) {
                Ok(doc) => doc,
                Err(err) => {
                    warn!(path = %path.display(), error = %format!("{err:#}"), "unreadable");
                    failed += 1;
                    continue;
                }
            };
            let out = response_path(&args.output, &title);
            if args.skip_existing && out.exists() {
                skipped += 1;
                continue;
            }
            let client = client.clone();
            inflight.spawn(async move {
                let result = client.annotate(text).await;
                (title, out, result)
            });
        }

        let Some(joined) = inflight.join_next().await else { break };
        let (title, out, result) = joined?;
        match result.and_then(|body| fs::write(&out, body).with_context(|| format!("writing {}", out.display()))) {
            Ok(()) => {
                saved += 1;
                info!(%title, path = %out.display(), "saved response");
            }
            Err(err) => {
                failed += 1;
                warn!(%title, error = %format!("{err:#}"), "post failed");
            }
        }
    }

    info!(saved, failed, skipped, output = %args.output.display(), "done");
    Ok(())
}
