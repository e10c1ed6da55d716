//! # Document Search
//!
//! Query side of the index: embed the question, take the `k` nearest documents under a
//! shared read lock, join them with their metadata and render a context block.
//!
//! ```no_run
//! use docindex_search::QueryEngine;
//! use docindex_vector_store::{IndexHandle, StubEmbedder};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let handle = IndexHandle::open(".docindex/index.snapshot", None).await?;
//!     let engine = QueryEngine::new(handle, Arc::new(StubEmbedder::new(384)));
//!
//!     let outcome = engine.query("how do I renew a license?").await?;
//!     println!("{}", outcome.render_context());
//!     Ok(())
//! }
//! ```

mod error;
mod outcome;
mod query;

pub use error::{Result, SearchError};
pub use outcome::{QueryOutcome, QueryStatus, RetrievedDocument, EMPTY_INDEX_MESSAGE};
pub use query::{QueryEngine, QueryOptions, DEFAULT_EXCERPT_CHARS, DEFAULT_K};
