use crate::error::{Result, VectorStoreError};
use serde::{Deserialize, Serialize};

/// Source metadata stored alongside each vector, addressed by the same ordinal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub id: String,
    pub name: String,
    pub text: String,
}

impl DocumentMetadata {
    pub fn new(id: impl Into<String>, name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            text: text.into(),
        }
    }

    /// Reject records that cannot be meaningfully indexed.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(VectorStoreError::InvalidDocument(
                "document id must not be empty".to_string(),
            ));
        }
        if self.text.trim().is_empty() {
            return Err(VectorStoreError::InvalidDocument(format!(
                "document '{}' has no text",
                self.id
            )));
        }
        Ok(())
    }
}

/// A search hit: ordinal plus squared Euclidean distance to the query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub ordinal: usize,
    pub distance: f32,
}

/// How a document whose id is already indexed is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestMode {
    /// Always append a new ordinal, duplicates included.
    #[default]
    Append,
    /// Replace the most recent record carrying the same id in place.
    UpsertById,
}

/// Result of committing one document to the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Committed {
    pub ordinal: usize,
    pub replaced: bool,
}
