use crate::error::{Result, VectorStoreError};
use crate::flat_index::VectorStore;
use crate::metadata::MetadataStore;
use crate::types::{Committed, DocumentMetadata, IngestMode, Neighbor};

/// Vectors plus their aligned metadata; the unit of persistence.
///
/// Every mutation touches both stores or neither, so `vectors().len() == metadata().len()`
/// holds whenever an `Index` is observable.
#[derive(Debug, Clone, Default)]
pub struct Index {
    vectors: VectorStore,
    metadata: MetadataStore,
}

impl Index {
    pub fn new(dimension: Option<usize>) -> Self {
        Self {
            vectors: VectorStore::new(dimension),
            metadata: MetadataStore::new(),
        }
    }

    pub(crate) fn from_parts(vectors: VectorStore, metadata: MetadataStore) -> Result<Self> {
        if vectors.len() != metadata.len() {
            return Err(VectorStoreError::Misaligned {
                vectors: vectors.len(),
                records: metadata.len(),
            });
        }
        Ok(Self { vectors, metadata })
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn dimension(&self) -> Option<usize> {
        self.vectors.dimension()
    }

    pub fn vectors(&self) -> &VectorStore {
        &self.vectors
    }

    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    /// Append the pair as one unit, returning the shared ordinal.
    pub fn append_document(&mut self, vector: &[f32], record: DocumentMetadata) -> Result<usize> {
        record.validate()?;
        let expected = self.metadata.len();
        if self.vectors.len() != expected {
            return Err(VectorStoreError::Misaligned {
                vectors: self.vectors.len(),
                records: expected,
            });
        }

        let ordinal = self.vectors.add(vector)?;
        let meta_ordinal = self.metadata.append(record);
        if meta_ordinal != ordinal {
            // Undo both sides so the pair is never half-visible.
            self.vectors.truncate(expected);
            self.metadata.truncate(expected);
            return Err(VectorStoreError::Misaligned {
                vectors: ordinal + 1,
                records: meta_ordinal + 1,
            });
        }
        Ok(ordinal)
    }

    /// Replace the latest record with the same id, or append when the id is new.
    pub fn upsert_document(
        &mut self,
        vector: &[f32],
        record: DocumentMetadata,
    ) -> Result<Committed> {
        record.validate()?;
        let Some(ordinal) = self.metadata.latest_ordinal_for_id(&record.id) else {
            let ordinal = self.append_document(vector, record)?;
            return Ok(Committed {
                ordinal,
                replaced: false,
            });
        };

        let previous = self
            .vectors
            .vector(ordinal)
            .map(<[f32]>::to_vec)
            .ok_or(VectorStoreError::OutOfRange {
                ordinal,
                len: self.vectors.len(),
            })?;
        self.vectors.replace(ordinal, vector)?;
        if let Err(err) = self.metadata.replace(ordinal, record) {
            self.vectors.replace(ordinal, &previous)?;
            return Err(err);
        }
        Ok(Committed {
            ordinal,
            replaced: true,
        })
    }

    pub fn commit(
        &mut self,
        vector: &[f32],
        record: DocumentMetadata,
        mode: IngestMode,
    ) -> Result<Committed> {
        match mode {
            IngestMode::Append => self.append_document(vector, record).map(|ordinal| Committed {
                ordinal,
                replaced: false,
            }),
            IngestMode::UpsertById => self.upsert_document(vector, record),
        }
    }

    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        self.vectors.search(query, k)
    }

    pub fn document(&self, ordinal: usize) -> Result<&DocumentMetadata> {
        self.metadata.get(ordinal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn doc(id: &str, text: &str) -> DocumentMetadata {
        DocumentMetadata::new(id, format!("Doc {id}"), text)
    }

    #[test]
    fn sizes_stay_aligned_while_appending() {
        let mut index = Index::new(None);
        for i in 0..10u8 {
            let ordinal = index
                .append_document(&[f32::from(i), 1.0], doc(&format!("d{i}"), "body"))
                .unwrap();
            assert_eq!(ordinal, usize::from(i));
            assert_eq!(index.vectors().len(), index.metadata().len());
        }
        assert_eq!(index.len(), 10);
        assert_eq!(index.dimension(), Some(2));
    }

    #[test]
    fn dimension_mismatch_leaves_both_stores_untouched() {
        let mut index = Index::new(Some(2));
        index.append_document(&[1.0, 0.0], doc("a", "x")).unwrap();

        let err = index
            .append_document(&[1.0, 0.0, 0.0], doc("b", "y"))
            .unwrap_err();
        assert!(matches!(
            err,
            VectorStoreError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
        assert_eq!(index.vectors().len(), 1);
        assert_eq!(index.metadata().len(), 1);
    }

    #[test]
    fn invalid_record_is_rejected_before_vector_append() {
        let mut index = Index::new(Some(1));
        assert!(index.append_document(&[1.0], doc("", "x")).is_err());
        assert!(index.is_empty());
        assert_eq!(index.metadata().len(), 0);
    }

    #[test]
    fn append_mode_duplicates_ids() {
        let mut index = Index::new(None);
        index
            .commit(&[1.0], doc("a", "first"), IngestMode::Append)
            .unwrap();
        let second = index
            .commit(&[2.0], doc("a", "second"), IngestMode::Append)
            .unwrap();
        assert_eq!(
            second,
            Committed {
                ordinal: 1,
                replaced: false
            }
        );
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn upsert_mode_replaces_in_place() {
        let mut index = Index::new(None);
        index
            .commit(&[1.0], doc("a", "first"), IngestMode::UpsertById)
            .unwrap();
        index
            .commit(&[5.0], doc("b", "other"), IngestMode::UpsertById)
            .unwrap();
        let committed = index
            .commit(&[2.0], doc("a", "second"), IngestMode::UpsertById)
            .unwrap();

        assert_eq!(
            committed,
            Committed {
                ordinal: 0,
                replaced: true
            }
        );
        assert_eq!(index.len(), 2);
        assert_eq!(index.document(0).unwrap().text, "second");
        assert_eq!(index.vectors().vector(0), Some(&[2.0][..]));
    }

    #[test]
    fn upsert_with_wrong_dimension_keeps_previous_state() {
        let mut index = Index::new(None);
        index
            .commit(&[1.0, 1.0], doc("a", "first"), IngestMode::UpsertById)
            .unwrap();
        assert!(index
            .commit(&[1.0], doc("a", "second"), IngestMode::UpsertById)
            .is_err());
        assert_eq!(index.document(0).unwrap().text, "first");
        assert_eq!(index.vectors().vector(0), Some(&[1.0, 1.0][..]));
    }

    #[test]
    fn from_parts_rejects_misaligned_stores() {
        let mut vectors = VectorStore::new(Some(1));
        vectors.add(&[1.0]).unwrap();
        let err = Index::from_parts(vectors, MetadataStore::new()).unwrap_err();
        assert!(matches!(
            err,
            VectorStoreError::Misaligned {
                vectors: 1,
                records: 0
            }
        ));
    }
}
