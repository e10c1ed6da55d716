use anyhow::{Context, Result};
use docindex_search::{DEFAULT_EXCERPT_CHARS, DEFAULT_K};
use docindex_vector_store::{default_snapshot_path_rel, IngestMode, StubEmbedder};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = "docindex.toml";

pub const ENV_CONFIG: &str = "DOCINDEX_CONFIG";
pub const ENV_SNAPSHOT: &str = "DOCINDEX_SNAPSHOT";
pub const ENV_EMBED_MODE: &str = "DOCINDEX_EMBED_MODE";
pub const ENV_EMBED_URL: &str = "DOCINDEX_EMBED_URL";
pub const ENV_EMBED_MODEL: &str = "DOCINDEX_EMBED_MODEL";

const DEFAULT_HTTP_MODEL: &str = "all-MiniLM-L6-v2";
const DEFAULT_API_KEY_ENV: &str = "DOCINDEX_EMBED_API_KEY";

/// `docindex.toml` as written on disk; every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub snapshot_path: Option<PathBuf>,
    pub dimension: Option<usize>,
    pub ingest: IngestSection,
    pub query: QuerySection,
    pub embedder: EmbedderSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IngestSection {
    pub mode: Option<String>,
    pub embed_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QuerySection {
    pub k: Option<usize>,
    pub excerpt_chars: Option<usize>,
    pub embed_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmbedderSection {
    pub mode: Option<String>,
    pub model: Option<String>,
    pub endpoint: Option<String>,
    pub api_key_env: Option<String>,
    pub dimension: Option<usize>,
}

impl FileConfig {
    pub fn parse(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("Invalid configuration")
    }

    /// Load the config file: an explicit path must exist, the implicit
    /// `./docindex.toml` is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let (path, required) = match explicit {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(CONFIG_FILE_NAME), false),
        };
        if !required && !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config =
            Self::parse(&raw).with_context(|| format!("Invalid config {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedMode {
    Stub,
    Http,
}

impl EmbedMode {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "stub" => Ok(Self::Stub),
            "http" => Ok(Self::Http),
            other => anyhow::bail!("Unsupported embedding mode: {other} (expected stub|http)"),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stub => "stub",
            Self::Http => "http",
        }
    }
}

pub fn parse_ingest_mode(value: &str) -> Result<IngestMode> {
    match value.trim().to_lowercase().replace('-', "_").as_str() {
        "append" => Ok(IngestMode::Append),
        "upsert_by_id" => Ok(IngestMode::UpsertById),
        other => {
            anyhow::bail!("Unsupported ingest mode: {other} (expected append|upsert_by_id)")
        }
    }
}

/// Values given on the command line; they win over everything else.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub snapshot: Option<PathBuf>,
    pub embed_mode: Option<EmbedMode>,
    pub embed_url: Option<String>,
    pub embed_model: Option<String>,
    pub dimension: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct EmbedderSettings {
    pub mode: EmbedMode,
    pub model: String,
    pub endpoint: Option<String>,
    pub api_key_env: String,
    /// Output size of the stub embedder
    pub dimension: usize,
}

/// Effective settings after flags, environment, file and defaults are merged.
#[derive(Debug, Clone)]
pub struct Settings {
    pub snapshot_path: PathBuf,
    pub dimension: Option<usize>,
    pub ingest_mode: IngestMode,
    pub ingest_timeout: Option<Duration>,
    pub query_k: usize,
    pub excerpt_chars: Option<usize>,
    pub query_timeout: Option<Duration>,
    pub embedder: EmbedderSettings,
}

impl Settings {
    pub fn resolve(
        file: FileConfig,
        overrides: Overrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let lookup = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let snapshot_path = overrides
            .snapshot
            .or_else(|| lookup(ENV_SNAPSHOT).map(PathBuf::from))
            .or(file.snapshot_path)
            .unwrap_or_else(default_snapshot_path_rel);

        let dimension = overrides.dimension.or(file.dimension);
        if dimension == Some(0) {
            anyhow::bail!("dimension must be greater than zero");
        }

        let embed_mode = match overrides.embed_mode {
            Some(mode) => mode,
            None => match lookup(ENV_EMBED_MODE).or(file.embedder.mode) {
                Some(raw) => EmbedMode::parse(&raw)?,
                None => EmbedMode::Stub,
            },
        };

        let model = overrides
            .embed_model
            .or_else(|| lookup(ENV_EMBED_MODEL))
            .or(file.embedder.model)
            .unwrap_or_else(|| match embed_mode {
                EmbedMode::Stub => StubEmbedder::MODEL_ID.to_string(),
                EmbedMode::Http => DEFAULT_HTTP_MODEL.to_string(),
            });
        let endpoint = overrides
            .embed_url
            .or_else(|| lookup(ENV_EMBED_URL))
            .or(file.embedder.endpoint);
        if embed_mode == EmbedMode::Http && endpoint.is_none() {
            anyhow::bail!(
                "Embedding mode 'http' needs an endpoint (--embed-url or {ENV_EMBED_URL})"
            );
        }

        let stub_dimension = overrides
            .dimension
            .or(file.embedder.dimension)
            .or(dimension)
            .unwrap_or(StubEmbedder::DEFAULT_DIMENSION);
        if stub_dimension == 0 {
            anyhow::bail!("embedder dimension must be greater than zero");
        }
        if let Some(index_dimension) = dimension.filter(|d| *d != stub_dimension) {
            anyhow::bail!(
                "dimension = {index_dimension} conflicts with [embedder] dimension = \
                 {stub_dimension}; every document would be rejected"
            );
        }

        let ingest_mode = match file.ingest.mode {
            Some(raw) => parse_ingest_mode(&raw)?,
            None => IngestMode::default(),
        };

        Ok(Self {
            snapshot_path,
            dimension,
            ingest_mode,
            ingest_timeout: file.ingest.embed_timeout_ms.map(Duration::from_millis),
            query_k: file.query.k.unwrap_or(DEFAULT_K),
            excerpt_chars: Some(file.query.excerpt_chars.unwrap_or(DEFAULT_EXCERPT_CHARS)),
            query_timeout: file.query.embed_timeout_ms.map(Duration::from_millis),
            embedder: EmbedderSettings {
                mode: embed_mode,
                model,
                endpoint,
                api_key_env: file
                    .embedder
                    .api_key_env
                    .unwrap_or_else(|| DEFAULT_API_KEY_ENV.to_string()),
                dimension: stub_dimension,
            },
        })
    }
}
