use thiserror::Error;

pub type Result<T> = std::result::Result<T, VectorStoreError>;

#[derive(Error, Debug)]
pub enum VectorStoreError {
    #[error("Invalid vector dimension: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Empty embedding vector")]
    EmptyVector,

    #[error("Embedding component {position} is not finite ({value})")]
    NonFiniteVector { position: usize, value: f32 },

    #[error("Ordinal {ordinal} out of range (size {len})")]
    OutOfRange { ordinal: usize, len: usize },

    #[error("Index misaligned: {vectors} vectors vs {records} metadata records")]
    Misaligned { vectors: usize, records: usize },

    #[error("Corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    #[error("Embedding error: {0}")]
    EmbedderFailure(String),

    #[error("Persistence error: {0}")]
    PersistenceFailure(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
