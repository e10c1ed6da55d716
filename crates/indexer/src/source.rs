use crate::error::{IndexerError, Result};
use docindex_vector_store::DocumentMetadata;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A raw document as handed over by a fetcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub text: String,
}

impl SourceDocument {
    pub fn new(id: impl Into<String>, name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            text: text.into(),
        }
    }
}

impl From<SourceDocument> for DocumentMetadata {
    fn from(doc: SourceDocument) -> Self {
        Self::new(doc.id, doc.name, doc.text)
    }
}

/// Read documents from a JSON array file or a JSON-lines file.
pub async fn load_documents(path: impl AsRef<Path>) -> Result<Vec<SourceDocument>> {
    let path = path.as_ref();
    let raw = tokio::fs::read_to_string(path).await?;
    let docs = parse_documents(&raw).map_err(|message| IndexerError::InvalidSource {
        path: path.display().to_string(),
        message,
    })?;
    log::info!("Loaded {} documents from {}", docs.len(), path.display());
    Ok(docs)
}

fn parse_documents(raw: &str) -> std::result::Result<Vec<SourceDocument>, String> {
    let trimmed = raw.trim_start();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).map_err(|err| err.to_string());
    }

    let mut docs = Vec::new();
    for (line_no, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let doc: SourceDocument = serde_json::from_str(line)
            .map_err(|err| format!("line {}: {err}", line_no + 1))?;
        docs.push(doc);
    }
    Ok(docs)
}
