//! # docindex Vector Store
//!
//! Embedding storage, exact nearest-neighbor search and durable snapshots for
//! document retrieval.
//!
//! ## Architecture
//!
//! ```text
//! IndexHandle (RwLock + ingest gate)
//!     │
//!     └──> Index
//!            ├─> VectorStore    (N x D f32 matrix, squared-L2 search)
//!            └─> MetadataStore  ({id, name, text} per ordinal)
//!                    │
//!                    └─> Snapshot (single file, tmp + fsync + rename)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use docindex_vector_store::{DocumentMetadata, Embedder, IndexHandle, IngestMode, StubEmbedder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let handle = IndexHandle::open(".docindex/index.snapshot", None).await?;
//!     let embedder = StubEmbedder::new(64);
//!
//!     let session = handle.begin_write().await;
//!     let vector = embedder.embed("alpha beta").await?;
//!     session
//!         .commit(&vector, DocumentMetadata::new("d1", "Doc A", "alpha beta"), IngestMode::Append)
//!         .await?;
//!     session.persist().await?;
//!     drop(session);
//!
//!     let query = embedder.embed("alpha beta").await?;
//!     let hits = handle.read().await.search(&query, 4)?;
//!     println!("{hits:?}");
//!     Ok(())
//! }
//! ```

mod embeddings;
mod error;
mod flat_index;
mod handle;
mod metadata;
mod paths;
mod snapshot;
mod snapshot_lock;
mod store;
mod types;

pub use embeddings::{embed_with_timeout, Embedder, StubEmbedder};
pub use error::{Result, VectorStoreError};
pub use flat_index::{squared_l2, VectorStore};
pub use handle::{IndexHandle, WriteSession};
pub use metadata::MetadataStore;
pub use paths::{
    default_snapshot_path_rel, snapshot_lock_path, snapshot_tmp_path, INDEX_DIR_NAME,
    SNAPSHOT_FILE_NAME,
};
pub use snapshot::{
    decode_snapshot, encode_snapshot, load_snapshot, save_snapshot, write_snapshot_bytes,
    SNAPSHOT_SCHEMA_VERSION,
};
pub use store::Index;
pub use types::{Committed, DocumentMetadata, IngestMode, Neighbor};
