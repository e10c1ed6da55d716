use crate::error::{Result, VectorStoreError};
use crate::types::DocumentMetadata;
use std::collections::HashMap;

/// Records aligned 1:1 with `VectorStore` ordinals.
#[derive(Debug, Clone, Default)]
pub struct MetadataStore {
    records: Vec<DocumentMetadata>,
    latest_by_id: HashMap<String, usize>,
}

impl MetadataStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_records(records: Vec<DocumentMetadata>) -> Self {
        let mut latest_by_id = HashMap::with_capacity(records.len());
        for (ordinal, record) in records.iter().enumerate() {
            latest_by_id.insert(record.id.clone(), ordinal);
        }
        Self {
            records,
            latest_by_id,
        }
    }

    pub fn append(&mut self, record: DocumentMetadata) -> usize {
        let ordinal = self.records.len();
        self.latest_by_id.insert(record.id.clone(), ordinal);
        self.records.push(record);
        ordinal
    }

    pub fn replace(&mut self, ordinal: usize, record: DocumentMetadata) -> Result<()> {
        let len = self.records.len();
        let slot = self
            .records
            .get_mut(ordinal)
            .ok_or(VectorStoreError::OutOfRange { ordinal, len })?;
        if slot.id != record.id {
            if self.latest_by_id.get(&slot.id) == Some(&ordinal) {
                self.latest_by_id.remove(&slot.id);
            }
            self.latest_by_id.insert(record.id.clone(), ordinal);
        }
        *slot = record;
        Ok(())
    }

    pub fn get(&self, ordinal: usize) -> Result<&DocumentMetadata> {
        self.records.get(ordinal).ok_or(VectorStoreError::OutOfRange {
            ordinal,
            len: self.records.len(),
        })
    }

    /// Most recently appended ordinal carrying `id`.
    #[must_use]
    pub fn latest_ordinal_for_id(&self, id: &str) -> Option<usize> {
        self.latest_by_id.get(id).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn records(&self) -> &[DocumentMetadata] {
        &self.records
    }

    /// Drop records at or after `len`, keeping the id lookup consistent.
    pub(crate) fn truncate(&mut self, len: usize) {
        if len >= self.records.len() {
            return;
        }
        self.records.truncate(len);
        self.latest_by_id.retain(|_, ordinal| *ordinal < len);
        for (ordinal, record) in self.records.iter().enumerate() {
            self.latest_by_id
                .entry(record.id.clone())
                .and_modify(|current| *current = (*current).max(ordinal))
                .or_insert(ordinal);
        }
    }
}
