use crate::error::{IndexerError, Result};
use crate::source::SourceDocument;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// Turns a directory of text files into source documents
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Scan directory for text files (.gitignore aware)
    pub fn scan(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();

        let mut builder = WalkBuilder::new(&self.root);
        builder
            .hidden(true) // do not index hidden files by default
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true);

        for result in builder.build() {
            match result {
                Ok(entry) => {
                    let Some(file_type) = entry.file_type() else {
                        continue;
                    };
                    if !file_type.is_file() {
                        continue;
                    }

                    let path = entry.path();
                    if let Ok(meta) = entry.metadata() {
                        if meta.len() > MAX_FILE_SIZE_BYTES {
                            log::warn!(
                                "Skipping large file {} ({} bytes > {})",
                                path.display(),
                                meta.len(),
                                MAX_FILE_SIZE_BYTES
                            );
                            continue;
                        }
                    }

                    if !Self::is_text_file(path) {
                        continue;
                    }

                    files.push(path.to_path_buf());
                }
                Err(e) => log::warn!("Failed to read entry: {e}"),
            }
        }

        files.sort();
        log::info!("Found {} text files under {}", files.len(), self.root.display());
        files
    }

    /// Read every scanned file into a document; id is the root-relative path.
    pub async fn load(&self) -> Result<Vec<SourceDocument>> {
        if !self.root.is_dir() {
            return Err(IndexerError::InvalidPath(format!(
                "Not a directory: {}",
                self.root.display()
            )));
        }

        let mut docs = Vec::new();
        for path in self.scan() {
            let bytes = tokio::fs::read(&path).await?;
            let Ok(text) = String::from_utf8(bytes) else {
                log::warn!("Skipping non UTF-8 file {}", path.display());
                continue;
            };
            let id = self.relative_id(&path);
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| id.clone());
            docs.push(SourceDocument { id, name, text });
        }
        Ok(docs)
    }

    fn relative_id(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    fn is_text_file(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext = ext.to_lowercase();
                TEXT_EXTENSIONS.iter().any(|candidate| *candidate == ext)
            })
            .unwrap_or(false)
    }
}

const MAX_FILE_SIZE_BYTES: u64 = 8 * 1_048_576; // 8 MB

const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "markdown", "rst", "html", "htm", "csv", "json"];
