use docindex_vector_store::VectorStoreError;
use serde::{Deserialize, Serialize};

/// Why a single document was not indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InvalidDocument,
    Embedder,
    DimensionMismatch,
    NonFiniteVector,
}

impl FailureKind {
    /// Map a per-document error to its kind. `None` means the error is not recoverable
    /// per document and must abort the batch.
    pub(crate) fn classify(err: &VectorStoreError) -> Option<Self> {
        match err {
            VectorStoreError::InvalidDocument(_) => Some(Self::InvalidDocument),
            VectorStoreError::EmbedderFailure(_) => Some(Self::Embedder),
            VectorStoreError::DimensionMismatch { .. } | VectorStoreError::EmptyVector => {
                Some(Self::DimensionMismatch)
            }
            VectorStoreError::NonFiniteVector { .. } => Some(Self::NonFiniteVector),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentFailure {
    /// Position of the document in the submitted batch
    pub position: usize,
    pub id: String,
    pub kind: FailureKind,
    pub message: String,
}

/// What happened to the snapshot after the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PersistOutcome {
    Saved,
    /// Nothing was committed, or persistence is disabled.
    Skipped,
    /// Committed documents are queryable in memory but not durable.
    Failed { message: String },
}

/// Statistics about one ingestion batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    /// Documents submitted
    pub requested: usize,

    /// Documents committed (appended or replaced)
    pub indexed: usize,

    /// Subset of `indexed` that replaced an existing record
    pub replaced: usize,

    /// Index size after the batch
    pub total_documents: usize,

    /// Time taken in milliseconds
    pub time_ms: u64,

    pub failures: Vec<DocumentFailure>,

    pub persistence: PersistOutcome,
}

impl IngestReport {
    pub fn new(requested: usize) -> Self {
        Self {
            requested,
            indexed: 0,
            replaced: 0,
            total_documents: 0,
            time_ms: 0,
            failures: Vec::new(),
            persistence: PersistOutcome::Skipped,
        }
    }

    pub fn add_committed(&mut self, replaced: bool) {
        self.indexed += 1;
        if replaced {
            self.replaced += 1;
        }
    }

    pub fn add_failure(&mut self, position: usize, id: &str, kind: FailureKind, message: String) {
        self.failures.push(DocumentFailure {
            position,
            id: id.to_string(),
            kind,
            message,
        });
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Committed documents survive a restart.
    pub fn is_durable(&self) -> bool {
        match self.persistence {
            PersistOutcome::Saved => true,
            PersistOutcome::Skipped => self.indexed == 0,
            PersistOutcome::Failed { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_separates_recoverable_errors() {
        assert_eq!(
            FailureKind::classify(&VectorStoreError::EmbedderFailure("x".into())),
            Some(FailureKind::Embedder)
        );
        assert_eq!(
            FailureKind::classify(&VectorStoreError::DimensionMismatch {
                expected: 2,
                actual: 3
            }),
            Some(FailureKind::DimensionMismatch)
        );
        assert_eq!(
            FailureKind::classify(&VectorStoreError::NonFiniteVector {
                position: 0,
                value: f32::NAN
            }),
            Some(FailureKind::NonFiniteVector)
        );
        assert_eq!(
            FailureKind::classify(&VectorStoreError::Misaligned {
                vectors: 1,
                records: 0
            }),
            None
        );
    }

    #[test]
    fn durability_follows_persistence_outcome() {
        let mut report = IngestReport::new(2);
        assert!(report.is_durable());

        report.add_committed(false);
        assert!(!report.is_durable());

        report.persistence = PersistOutcome::Saved;
        assert!(report.is_durable());

        report.persistence = PersistOutcome::Failed {
            message: "disk full".into(),
        };
        assert!(!report.is_durable());
    }

    #[test]
    fn report_serializes_persistence_tag() {
        let mut report = IngestReport::new(1);
        report.persistence = PersistOutcome::Failed {
            message: "denied".into(),
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["persistence"]["status"], "failed");
        assert_eq!(value["persistence"]["message"], "denied");
    }
}
