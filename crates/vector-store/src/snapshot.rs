//! Durable snapshot of an [`Index`].
//!
//! One file holds the whole index:
//!
//! ```text
//! "DIX1" | schema u32 | dimension u32 | count u64 | metadata_len u64   (little endian)
//! count * dimension f32                                                 (little endian)
//! metadata_len bytes of JSON: [DocumentMetadata; count]
//! sha256 of everything above                                            (32 bytes)
//! ```
//!
//! Saves go to `<snapshot>.tmp`, are fsynced, then renamed into place, so readers only ever
//! see a complete previous or complete new snapshot.

use crate::error::{Result, VectorStoreError};
use crate::flat_index::VectorStore;
use crate::metadata::MetadataStore;
use crate::paths::snapshot_tmp_path;
use crate::snapshot_lock::acquire_snapshot_write_lock;
use crate::store::Index;
use crate::types::DocumentMetadata;
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::io::AsyncWriteExt;

const SNAPSHOT_MAGIC: &[u8; 4] = b"DIX1";
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;
const HEADER_LEN: usize = 4 + 4 + 4 + 8 + 8;
const DIGEST_LEN: usize = 32;

/// Serialize the index into snapshot bytes.
pub fn encode_snapshot(index: &Index) -> Result<Vec<u8>> {
    let vectors = index.vectors();
    let records = index.metadata().records();
    if vectors.len() != records.len() {
        return Err(VectorStoreError::Misaligned {
            vectors: vectors.len(),
            records: records.len(),
        });
    }

    let dimension = u32::try_from(index.dimension().unwrap_or(0)).map_err(|_| {
        VectorStoreError::PersistenceFailure("dimension does not fit the snapshot header".into())
    })?;
    let metadata = serde_json::to_vec(records)?;
    let matrix = vectors.as_slice();

    let mut out = Vec::with_capacity(HEADER_LEN + matrix.len() * 4 + metadata.len() + DIGEST_LEN);
    out.extend_from_slice(SNAPSHOT_MAGIC);
    out.extend_from_slice(&SNAPSHOT_SCHEMA_VERSION.to_le_bytes());
    out.extend_from_slice(&dimension.to_le_bytes());
    out.extend_from_slice(&(vectors.len() as u64).to_le_bytes());
    out.extend_from_slice(&(metadata.len() as u64).to_le_bytes());
    for value in matrix {
        out.extend_from_slice(&value.to_le_bytes());
    }
    out.extend_from_slice(&metadata);

    let digest = Sha256::digest(&out);
    out.extend_from_slice(&digest);
    Ok(out)
}

/// Rebuild an index from snapshot bytes, rejecting anything truncated or inconsistent.
pub fn decode_snapshot(bytes: &[u8]) -> Result<Index> {
    if bytes.len() < HEADER_LEN + DIGEST_LEN {
        return Err(corrupt(format!(
            "{} bytes is shorter than the minimum snapshot size",
            bytes.len()
        )));
    }
    if &bytes[0..4] != SNAPSHOT_MAGIC {
        return Err(corrupt("bad magic".to_string()));
    }
    let schema = read_u32(bytes, 4)?;
    if schema != SNAPSHOT_SCHEMA_VERSION {
        return Err(corrupt(format!(
            "unsupported schema_version {schema} (expected {SNAPSHOT_SCHEMA_VERSION})"
        )));
    }
    let dimension = read_u32(bytes, 8)? as usize;
    let count = usize::try_from(read_u64(bytes, 12)?)
        .map_err(|_| corrupt("vector count overflows usize".to_string()))?;
    let metadata_len = usize::try_from(read_u64(bytes, 20)?)
        .map_err(|_| corrupt("metadata length overflows usize".to_string()))?;

    if dimension == 0 && count > 0 {
        return Err(corrupt(format!("{count} vectors with unset dimension")));
    }

    let matrix_len = count
        .checked_mul(dimension)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| corrupt("vector matrix size overflows".to_string()))?;
    let expected_len = HEADER_LEN
        .checked_add(matrix_len)
        .and_then(|n| n.checked_add(metadata_len))
        .and_then(|n| n.checked_add(DIGEST_LEN))
        .ok_or_else(|| corrupt("snapshot size overflows".to_string()))?;
    if bytes.len() != expected_len {
        return Err(corrupt(format!(
            "expected {expected_len} bytes, found {}",
            bytes.len()
        )));
    }

    let body_len = expected_len - DIGEST_LEN;
    let digest = Sha256::digest(&bytes[..body_len]);
    if digest.as_slice() != &bytes[body_len..] {
        return Err(corrupt("checksum mismatch".to_string()));
    }

    let matrix_end = HEADER_LEN + matrix_len;
    let mut vectors = VectorStore::new((dimension > 0).then_some(dimension));
    // Grows with the first row, so the header dimension alone never sizes an allocation.
    let mut row = Vec::new();
    let rows = bytes[HEADER_LEN..matrix_end].chunks_exact(dimension.max(1) * 4);
    for (ordinal, raw_row) in rows.enumerate() {
        row.clear();
        for raw in raw_row.chunks_exact(4) {
            row.push(f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]));
        }
        vectors
            .add(&row)
            .map_err(|err| corrupt(format!("vector {ordinal}: {err}")))?;
    }

    let records: Vec<DocumentMetadata> =
        serde_json::from_slice(&bytes[matrix_end..body_len]).map_err(|err| {
            corrupt(format!("metadata section is not valid JSON: {err}"))
        })?;
    if records.len() != count {
        return Err(corrupt(format!(
            "{count} vectors but {} metadata records",
            records.len()
        )));
    }

    Index::from_parts(vectors, MetadataStore::from_records(records))
}

/// Atomically replace the snapshot at `path` with `bytes`.
pub async fn write_snapshot_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|err| persistence(format!("create {}: {err}", parent.display())))?;
    }

    let _lock = acquire_snapshot_write_lock(path).await?;
    let tmp = snapshot_tmp_path(path);

    let mut file = tokio::fs::File::create(&tmp)
        .await
        .map_err(|err| persistence(format!("create {}: {err}", tmp.display())))?;
    file.write_all(bytes)
        .await
        .map_err(|err| persistence(format!("write {}: {err}", tmp.display())))?;
    file.sync_all()
        .await
        .map_err(|err| persistence(format!("sync {}: {err}", tmp.display())))?;
    drop(file);

    if let Err(err) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(persistence(format!(
            "rename {} -> {}: {err}",
            tmp.display(),
            path.display()
        )));
    }
    sync_parent_dir(path).await;
    Ok(())
}

/// Save `index` to `path`.
pub async fn save_snapshot(index: &Index, path: &Path) -> Result<()> {
    let bytes = encode_snapshot(index)?;
    write_snapshot_bytes(path, &bytes).await?;
    log::info!(
        "Saved snapshot {} ({} documents, {} bytes)",
        path.display(),
        index.len(),
        bytes.len()
    );
    Ok(())
}

/// Load the snapshot at `path`; a missing snapshot yields an empty index.
///
/// `dimension` is the dimension the caller expects, if known. A snapshot built with a
/// different dimension is rejected rather than mixed with new embeddings.
pub async fn load_snapshot(path: &Path, dimension: Option<usize>) -> Result<Index> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            log::info!("No snapshot at {}; starting with an empty index", path.display());
            return Ok(Index::new(dimension));
        }
        Err(err) => return Err(err.into()),
    };

    let index = decode_snapshot(&bytes)?;
    let index = match (dimension, index.dimension()) {
        (Some(expected), Some(actual)) if expected != actual => {
            return Err(VectorStoreError::DimensionMismatch { expected, actual });
        }
        (Some(expected), None) => Index::new(Some(expected)),
        _ => index,
    };

    log::info!(
        "Loaded snapshot {} ({} documents, dimension {:?})",
        path.display(),
        index.len(),
        index.dimension()
    );
    Ok(index)
}

#[cfg(unix)]
async fn sync_parent_dir(path: &Path) {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return;
    };
    let parent = parent.to_path_buf();
    let _ = tokio::task::spawn_blocking(move || {
        if let Ok(dir) = std::fs::File::open(&parent) {
            let _ = dir.sync_all();
        }
    })
    .await;
}

#[cfg(not(unix))]
async fn sync_parent_dir(_path: &Path) {}

fn read_u32(bytes: &[u8], offset: usize) -> Result<u32> {
    bytes
        .get(offset..offset + 4)
        .and_then(|raw| raw.try_into().ok())
        .map(u32::from_le_bytes)
        .ok_or_else(|| corrupt(format!("truncated header at offset {offset}")))
}

fn read_u64(bytes: &[u8], offset: usize) -> Result<u64> {
    bytes
        .get(offset..offset + 8)
        .and_then(|raw| raw.try_into().ok())
        .map(u64::from_le_bytes)
        .ok_or_else(|| corrupt(format!("truncated header at offset {offset}")))
}

fn corrupt(message: String) -> VectorStoreError {
    VectorStoreError::CorruptSnapshot(message)
}

fn persistence(message: String) -> VectorStoreError {
    VectorStoreError::PersistenceFailure(message)
}
