use crate::error::{Result, SearchError};
use crate::outcome::{truncate_chars, QueryOutcome, QueryStatus, RetrievedDocument};
use docindex_vector_store::{embed_with_timeout, Embedder, Index, IndexHandle, Neighbor};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_K: usize = 4;
pub const DEFAULT_EXCERPT_CHARS: usize = 2000;

#[derive(Clone, Debug)]
pub struct QueryOptions {
    pub k: usize,
    /// `None` returns the full document text
    pub excerpt_chars: Option<usize>,
    pub embed_timeout: Option<Duration>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            excerpt_chars: Some(DEFAULT_EXCERPT_CHARS),
            embed_timeout: None,
        }
    }
}

/// Answers text queries against a shared index
pub struct QueryEngine {
    handle: IndexHandle,
    embedder: Arc<dyn Embedder>,
    options: QueryOptions,
}

impl QueryEngine {
    pub fn new(handle: IndexHandle, embedder: Arc<dyn Embedder>) -> Self {
        Self::with_options(handle, embedder, QueryOptions::default())
    }

    pub fn with_options(
        handle: IndexHandle,
        embedder: Arc<dyn Embedder>,
        options: QueryOptions,
    ) -> Self {
        Self {
            handle,
            embedder,
            options,
        }
    }

    /// Query with the engine's default `k` and excerpt length.
    pub async fn query(&self, text: &str) -> Result<QueryOutcome> {
        self.query_with(text, self.options.k, self.options.excerpt_chars)
            .await
    }

    pub async fn query_with(
        &self,
        text: &str,
        k: usize,
        excerpt_chars: Option<usize>,
    ) -> Result<QueryOutcome> {
        {
            let index = self.handle.read().await;
            if index.is_empty() || index.dimension().is_none() {
                log::debug!("Query '{text}' against an empty index");
                return Ok(QueryOutcome::empty());
            }
        }

        if text.trim().is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        // Writers may commit while the query is being embedded; that is fine, the
        // search below sees a consistent index either way.
        let query =
            embed_with_timeout(self.embedder.as_ref(), text, self.options.embed_timeout).await?;

        let index = self.handle.read().await;
        let neighbors = index.search(&query, k)?;
        log::debug!(
            "Query '{text}': {} neighbors (k={k}) out of {}",
            neighbors.len(),
            index.len()
        );

        Ok(QueryOutcome {
            status: QueryStatus::Success,
            results: join_metadata(&index, neighbors, excerpt_chars),
        })
    }
}

/// Attach metadata to ranked neighbors, dropping any ordinal without a record.
fn join_metadata(
    index: &Index,
    neighbors: Vec<Neighbor>,
    excerpt_chars: Option<usize>,
) -> Vec<RetrievedDocument> {
    let mut results = Vec::with_capacity(neighbors.len());
    for neighbor in neighbors {
        let Ok(record) = index.document(neighbor.ordinal) else {
            log::debug!("Skipping ordinal {} with no metadata", neighbor.ordinal);
            continue;
        };
        results.push(RetrievedDocument {
            ordinal: neighbor.ordinal,
            id: record.id.clone(),
            name: record.name.clone(),
            text_excerpt: truncate_chars(&record.text, excerpt_chars),
            distance: neighbor.distance,
        });
    }
    results
}
