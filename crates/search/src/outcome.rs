use serde::{Deserialize, Serialize};

/// Context text rendered when the index holds nothing to search.
pub const EMPTY_INDEX_MESSAGE: &str = "No index found or it is empty; no information available.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStatus {
    Success,
    /// The index had no documents (or no dimension yet)
    Empty,
}

/// One ranked hit joined with its metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    pub ordinal: usize,
    pub id: String,
    pub name: String,

    /// Document text cut to the configured number of characters
    pub text_excerpt: String,

    /// Squared L2 distance to the query; smaller is closer
    pub distance: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryOutcome {
    pub status: QueryStatus,
    pub results: Vec<RetrievedDocument>,
}

impl QueryOutcome {
    pub fn empty() -> Self {
        Self {
            status: QueryStatus::Empty,
            results: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Render hits as `--- name ---` blocks, ready to hand to a language model.
    pub fn render_context(&self) -> String {
        if self.results.is_empty() {
            return EMPTY_INDEX_MESSAGE.to_string();
        }
        self.results
            .iter()
            .map(|doc| format!("--- {} ---\n{}", doc.name, doc.text_excerpt))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Keep at most `max_chars` characters of `text`.
pub(crate) fn truncate_chars(text: &str, max_chars: Option<usize>) -> String {
    let Some(max_chars) = max_chars else {
        return text.to_string();
    };
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}
