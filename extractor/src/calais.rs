use anyhow::{bail, Context, Result};
use neg_core::extract::read_document;
use neg_core::{Entity, EntityExtractor, TextEntities};
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::debug;

pub const CALAIS_URL: &str = "https://api.thomsonreuters.com/permid/calais";
pub const USER_AGENT: &str = "Calais Rest Client";

/// Thin async client for the Calais tagging endpoint. Cheap to clone.
#[derive(Debug, Clone)]
pub struct CalaisClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl CalaisClient {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            bail!("empty Calais API key");
        }
        let client = Client::builder().user_agent(USER_AGENT).timeout(timeout).build()?;
        Ok(Self { client, endpoint: CALAIS_URL.to_string(), api_key })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn endpoint(&self) -> &str { &self.endpoint }

    /// Post raw text, returning the JSON response body.
    pub async fn annotate(&self, text: String) -> Result<String> {
        let resp = self
            .client
            .post(&self.endpoint)
            .header("X-AG-Access-Token", &self.api_key)
            .header(header::CONTENT_TYPE, "text/raw")
            .header("outputformat", "application/json")
            .body(text)
            .send()
            .await
            .with_context(|| format!("posting to {}", self.endpoint))?;
        let status = resp.status();
        let body = resp.text().await.context("reading Calais response body")?;
        if status == StatusCode::NOT_IMPLEMENTED {
            bail!("{} does not implement this request (501): {body}", self.endpoint);
        }
        if !status.is_success() {
            bail!("{} answered {status}: {body}", self.endpoint);
        }
        Ok(body)
    }
}

#[derive(Debug, Deserialize)]
struct CalaisEntity {
    #[serde(rename = "_type")]
    kind: Option<String>,
    name: Option<String>,
    relevance: Option<f64>,
    #[serde(default)]
    instances: Vec<CalaisInstance>,
}

#[derive(Debug, Deserialize)]
struct CalaisInstance {
    exact: Option<String>,
    offset: Option<usize>,
    length: Option<usize>,
}

/// Entities of a Calais JSON response, one per instance, sorted by offset.
pub fn parse_calais_response(title: &str, text: &str, body: &str) -> Result<TextEntities> {
    let root: Map<String, Value> = serde_json::from_str(body).with_context(|| format!("parsing Calais response for {title}"))?;

    let mut entities = Vec::new();
    for (key, value) in &root {
        if value.get("_typeGroup").and_then(Value::as_str) != Some("entities") {
            continue;
        }
        let parsed: CalaisEntity =
            serde_json::from_value(value.clone()).with_context(|| format!("malformed entity {key} in response for {title}"))?;
        let kind = parsed.kind.unwrap_or_else(|| "Entity".to_string());
        for instance in parsed.instances {
            let Some(name) = parsed.name.clone().or(instance.exact) else {
                debug!(%title, %key, "skipping unnamed entity instance");
                continue;
            };
            let mut entity = Entity::new(name, kind.clone());
            entity.offset = instance.offset;
            entity.length = instance.length;
            entity.relevance = parsed.relevance;
            entities.push(entity);
        }
    }
    entities.sort_by_key(|e| e.offset.unwrap_or(usize::MAX));
    Ok(TextEntities::new(title, text, entities))
}

/// `<dir>/<title>.json`
pub fn response_path(dir: &Path, title: &str) -> PathBuf { dir.join(format!("{title}.json")) }

/// Live extractor: one blocking request per document.
pub struct CalaisExtractor {
    client: CalaisClient,
    runtime: Runtime,
    response_dir: Option<PathBuf>,
}

impl CalaisExtractor {
    pub fn new(client: CalaisClient) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        Ok(Self { client, runtime, response_dir: None })
    }

    /// Keep every raw response next to the others in `dir`.
    pub fn save_responses_to(mut self, dir: impl Into<PathBuf>) -> Self {
        self.response_dir = Some(dir.into());
        self
    }
}

impl EntityExtractor for CalaisExtractor {
    fn get_entities(&self, path: &Path) -> Result<TextEntities> {
        let (title, text) = read_document(path)?;
        let body = self.runtime.block_on(self.client.annotate(text.clone()))?;
        if let Some(dir) = &self.response_dir {
            fs::create_dir_all(dir)?;
            let out = response_path(dir, &title);
            fs::write(&out, &body).with_context(|| format!("saving response {}", out.display()))?;
        }
        parse_calais_response(&title, &text, &body)
    }
}

/// Offline extractor over responses saved by an earlier run or by `calais-post`.
#[derive(Debug, Clone)]
pub struct CachedResponseExtractor {
    dir: PathBuf,
}

impl CachedResponseExtractor {
    pub fn new(dir: impl Into<PathBuf>) -> Self { Self { dir: dir.into() } }
}

impl EntityExtractor for CachedResponseExtractor {
    fn get_entities(&self, path: &Path) -> Result<TextEntities> {
        let (title, text) = read_document(path)?;
        let saved = response_path(&self.dir, &title);
        let body = fs::read_to_string(&saved).with_context(|| format!("no saved response {}", saved.display()))?;
        parse_calais_response(&title, &text, &body)
    }
}
