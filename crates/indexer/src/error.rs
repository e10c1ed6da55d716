use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexerError>;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Vector store error: {0}")]
    VectorStoreError(#[from] docindex_vector_store::VectorStoreError),

    #[error("Invalid document source {path}: {message}")]
    InvalidSource { path: String, message: String },

    #[error("Invalid path: {0}")]
    InvalidPath(String),
}
