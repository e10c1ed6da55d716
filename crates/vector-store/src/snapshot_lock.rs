use crate::error::{Result, VectorStoreError};
use crate::paths::snapshot_lock_path;
use fs2::FileExt;
use std::path::Path;
use std::time::Instant;

pub(crate) struct SnapshotWriteLock {
    file: std::fs::File,
}

impl Drop for SnapshotWriteLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

/// Take the exclusive cross-process lock guarding saves to `snapshot`.
pub(crate) async fn acquire_snapshot_write_lock(snapshot: &Path) -> Result<SnapshotWriteLock> {
    let path = snapshot_lock_path(snapshot);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    tokio::task::spawn_blocking(move || -> Result<SnapshotWriteLock> {
        use std::fs::OpenOptions;

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|err| {
                VectorStoreError::PersistenceFailure(format!(
                    "open snapshot lock {}: {err}",
                    path.display()
                ))
            })?;

        let start = Instant::now();
        file.lock_exclusive().map_err(|err| {
            VectorStoreError::PersistenceFailure(format!(
                "acquire snapshot lock {}: {err}",
                path.display()
            ))
        })?;
        let waited = start.elapsed();
        if waited.as_millis() > 0 {
            log::debug!("Waited {}ms for snapshot lock {}", waited.as_millis(), path.display());
        }

        Ok(SnapshotWriteLock { file })
    })
    .await
    .map_err(|err| VectorStoreError::PersistenceFailure(format!("join snapshot lock task: {err}")))?
}
