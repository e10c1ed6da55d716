use crate::config::{EmbedMode, EmbedderSettings};
use anyhow::{Context, Result};
use async_trait::async_trait;
use docindex_vector_store::{Embedder, StubEmbedder, VectorStoreError};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for an OpenAI-compatible embeddings endpoint.
///
/// Sends `{"model", "input"}` and accepts either the OpenAI shape
/// (`{"data": [{"embedding": [...]}]}`) or a bare `{"embedding": [...]}`.
pub struct HttpEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EmbeddingResponse {
    Batch { data: Vec<EmbeddingItem> },
    Single { embedding: Vec<f32> },
}

#[derive(Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: None,
        })
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }
}

fn failure(message: String) -> VectorStoreError {
    VectorStoreError::EmbedderFailure(message)
}

fn parse_embedding(body: &[u8]) -> docindex_vector_store::Result<Vec<f32>> {
    let response: EmbeddingResponse = serde_json::from_slice(body)
        .map_err(|err| failure(format!("unexpected response body: {err}")))?;
    match response {
        EmbeddingResponse::Batch { data } => data
            .into_iter()
            .next()
            .map(|item| item.embedding)
            .ok_or_else(|| failure("response contained no embeddings".to_string())),
        EmbeddingResponse::Single { embedding } => Ok(embedding),
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> docindex_vector_store::Result<Vec<f32>> {
        let mut request = self.client.post(&self.endpoint).json(&serde_json::json!({
            "model": self.model,
            "input": text,
        }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|err| failure(format!("POST {} failed: {err}", self.endpoint)))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| failure(format!("reading response from {}: {err}", self.endpoint)))?;
        if !status.is_success() {
            let snippet: String = String::from_utf8_lossy(&body).chars().take(200).collect();
            return Err(failure(format!("{} returned {status}: {snippet}", self.endpoint)));
        }

        let vector = parse_embedding(&body)?;
        log::debug!("Embedded {} chars into {} dims", text.len(), vector.len());
        Ok(vector)
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

/// Build the embedder selected by the settings.
pub fn build_embedder(settings: &EmbedderSettings) -> Result<Arc<dyn Embedder>> {
    match settings.mode {
        EmbedMode::Stub => Ok(Arc::new(StubEmbedder::new(settings.dimension))),
        EmbedMode::Http => {
            let endpoint = settings
                .endpoint
                .clone()
                .context("Embedding mode 'http' needs an endpoint")?;
            let api_key = std::env::var(&settings.api_key_env)
                .ok()
                .filter(|key| !key.trim().is_empty());
            log::debug!(
                "Using HTTP embedder {} (model {}, api key {})",
                endpoint,
                settings.model,
                if api_key.is_some() { "set" } else { "unset" }
            );
            let embedder = HttpEmbedder::new(endpoint, settings.model.clone())?;
            Ok(Arc::new(embedder.with_api_key(api_key)))
        }
    }
}
