//! # Document Indexer
//!
//! Turns raw documents into committed index entries.
//!
//! ## Pipeline
//!
//! ```text
//! JSON / JSONL file or directory
//!     │
//!     ├──> Source loader (.gitignore aware for directories)
//!     │      └─> SourceDocument { id, name, text }
//!     │
//!     ├──> Embedder (one call per document, outside the index lock)
//!     │      └─> Vector
//!     │
//!     └──> IndexHandle (append or upsert, then snapshot)
//!            └─> IngestReport
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use docindex_indexer::{load_documents, IngestionPipeline};
//! use docindex_vector_store::{IndexHandle, StubEmbedder};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let handle = IndexHandle::open(".docindex/index.snapshot", None).await?;
//!     let pipeline = IngestionPipeline::new(handle, Arc::new(StubEmbedder::new(384)));
//!
//!     let report = pipeline.ingest(load_documents("docs.jsonl").await?).await?;
//!     println!("Indexed {}/{} documents", report.indexed, report.requested);
//!     Ok(())
//! }
//! ```

mod error;
mod indexer;
mod scanner;
mod source;
mod stats;

pub use error::{IndexerError, Result};
pub use indexer::{IngestOptions, IngestionPipeline};
pub use scanner::DirectorySource;
pub use source::{load_documents, SourceDocument};
pub use stats::{DocumentFailure, FailureKind, IngestReport, PersistOutcome};
