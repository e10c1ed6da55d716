use crate::error::Result;
use crate::snapshot::{encode_snapshot, load_snapshot, write_snapshot_bytes};
use crate::store::Index;
use crate::types::{Committed, DocumentMetadata, IngestMode};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard};

/// Shared handle to one index and the snapshot it persists to.
///
/// Readers share an `RwLock`; writers go through a [`WriteSession`], of which at most one
/// exists per handle at a time.
#[derive(Clone)]
pub struct IndexHandle {
    inner: Arc<Inner>,
}

struct Inner {
    index: RwLock<Index>,
    ingest_gate: Mutex<()>,
    snapshot_path: PathBuf,
}

impl IndexHandle {
    pub fn new(index: Index, snapshot_path: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(Inner {
                index: RwLock::new(index),
                ingest_gate: Mutex::new(()),
                snapshot_path: snapshot_path.into(),
            }),
        }
    }

    /// Load the snapshot at `snapshot_path` (or start empty when it does not exist).
    pub async fn open(snapshot_path: impl AsRef<Path>, dimension: Option<usize>) -> Result<Self> {
        let path = snapshot_path.as_ref();
        let index = load_snapshot(path, dimension).await?;
        Ok(Self::new(index, path))
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.inner.snapshot_path
    }

    /// Shared read access for the duration of one query.
    pub async fn read(&self) -> RwLockReadGuard<'_, Index> {
        self.inner.index.read().await
    }

    pub async fn len(&self) -> usize {
        self.inner.index.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.index.read().await.is_empty()
    }

    pub async fn dimension(&self) -> Option<usize> {
        self.inner.index.read().await.dimension()
    }

    /// Wait for exclusive ingestion rights on this index.
    pub async fn begin_write(&self) -> WriteSession<'_> {
        let gate = self.inner.ingest_gate.lock().await;
        WriteSession {
            handle: self,
            _gate: gate,
        }
    }
}

/// Exclusive ingestion rights; held for a whole add-then-persist batch.
pub struct WriteSession<'a> {
    handle: &'a IndexHandle,
    _gate: MutexGuard<'a, ()>,
}

impl WriteSession<'_> {
    pub async fn dimension(&self) -> Option<usize> {
        self.handle.dimension().await
    }

    /// Commit one document; both stores change under a single write lock.
    pub async fn commit(
        &self,
        vector: &[f32],
        record: DocumentMetadata,
        mode: IngestMode,
    ) -> Result<Committed> {
        let mut index = self.handle.inner.index.write().await;
        index.commit(vector, record, mode)
    }

    /// Write the current index to the handle's snapshot path.
    pub async fn persist(&self) -> Result<()> {
        let (bytes, documents) = {
            let index = self.handle.inner.index.read().await;
            (encode_snapshot(&index)?, index.len())
        };
        let path = self.handle.snapshot_path();
        write_snapshot_bytes(path, &bytes).await?;
        log::info!(
            "Saved snapshot {} ({documents} documents, {} bytes)",
            path.display(),
            bytes.len()
        );
        Ok(())
    }
}
