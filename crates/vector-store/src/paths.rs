use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub const INDEX_DIR_NAME: &str = ".docindex";
pub const SNAPSHOT_FILE_NAME: &str = "index.snapshot";

#[must_use]
pub fn default_snapshot_path_rel() -> PathBuf {
    PathBuf::from(INDEX_DIR_NAME).join(SNAPSHOT_FILE_NAME)
}

/// Staging file a save writes before renaming over the snapshot.
#[must_use]
pub fn snapshot_tmp_path(snapshot: &Path) -> PathBuf {
    sibling_with_suffix(snapshot, ".tmp")
}

/// Advisory lock file serializing saves to one snapshot across processes.
#[must_use]
pub fn snapshot_lock_path(snapshot: &Path) -> PathBuf {
    sibling_with_suffix(snapshot, ".lock")
}

fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path
        .file_name()
        .map_or_else(|| OsString::from(SNAPSHOT_FILE_NAME), OsString::from);
    name.push(suffix);
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sibling_paths_keep_full_file_name() {
        let snapshot = Path::new("/data/.docindex/index.snapshot");
        assert_eq!(
            snapshot_tmp_path(snapshot),
            PathBuf::from("/data/.docindex/index.snapshot.tmp")
        );
        assert_eq!(
            snapshot_lock_path(snapshot),
            PathBuf::from("/data/.docindex/index.snapshot.lock")
        );
    }

    #[test]
    fn default_path_is_under_index_dir() {
        assert_eq!(
            default_snapshot_path_rel(),
            PathBuf::from(".docindex/index.snapshot")
        );
    }
}
