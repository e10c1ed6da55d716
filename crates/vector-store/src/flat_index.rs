use crate::error::{Result, VectorStoreError};
use crate::types::Neighbor;
use std::cmp::Ordering;

/// Dense row-major matrix of embeddings with exact nearest-neighbor search.
///
/// Search is a linear scan (squared Euclidean distance). Callers only depend on the
/// `search` contract, so a graph index can replace the scan later.
#[derive(Debug, Clone, Default)]
pub struct VectorStore {
    dimension: Option<usize>,
    data: Vec<f32>,
    len: usize,
}

impl VectorStore {
    /// Create a store; `None` leaves the dimension to be fixed by the first insertion.
    pub fn new(dimension: Option<usize>) -> Self {
        Self {
            dimension: dimension.filter(|d| *d > 0),
            data: Vec::new(),
            len: 0,
        }
    }

    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append a vector, returning its ordinal.
    pub fn add(&mut self, vector: &[f32]) -> Result<usize> {
        let dimension = self.check_dimension(vector)?;
        if self.dimension.is_none() {
            log::debug!("Fixing vector dimension at {dimension}");
            self.dimension = Some(dimension);
        }
        let ordinal = self.len;
        self.data.extend_from_slice(vector);
        self.len += 1;
        Ok(ordinal)
    }

    /// Overwrite the vector stored at `ordinal`.
    pub fn replace(&mut self, ordinal: usize, vector: &[f32]) -> Result<()> {
        if ordinal >= self.len {
            return Err(VectorStoreError::OutOfRange {
                ordinal,
                len: self.len,
            });
        }
        let dimension = self.check_dimension(vector)?;
        let start = ordinal * dimension;
        self.data[start..start + dimension].copy_from_slice(vector);
        Ok(())
    }

    /// Drop every vector at or after `len`. Used to roll back a half-committed append.
    pub(crate) fn truncate(&mut self, len: usize) {
        if len >= self.len {
            return;
        }
        let dimension = self.dimension.unwrap_or(0);
        self.data.truncate(len * dimension);
        self.len = len;
    }

    pub fn vector(&self, ordinal: usize) -> Option<&[f32]> {
        if ordinal >= self.len {
            return None;
        }
        let dimension = self.dimension?;
        let start = ordinal * dimension;
        self.data.get(start..start + dimension)
    }

    /// Raw row-major storage, `len() * dimension()` values.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Top-`k` nearest vectors, ascending distance, ties broken by ascending ordinal.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        let Some(dimension) = self.dimension else {
            return Ok(Vec::new());
        };
        self.check_dimension(query)?;
        if self.len == 0 || k == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<Neighbor> = self
            .data
            .chunks_exact(dimension)
            .enumerate()
            .map(|(ordinal, row)| Neighbor {
                ordinal,
                distance: squared_l2(query, row),
            })
            .collect();

        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, compare_neighbors);
            scored.truncate(k);
        }
        scored.sort_unstable_by(compare_neighbors);

        Ok(scored)
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<usize> {
        if vector.is_empty() {
            return Err(VectorStoreError::EmptyVector);
        }
        match self.dimension {
            Some(expected) if expected != vector.len() => {
                return Err(VectorStoreError::DimensionMismatch {
                    expected,
                    actual: vector.len(),
                });
            }
            _ => {}
        }
        // NaN and infinities break distance ordering.
        if let Some((position, value)) = vector.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(VectorStoreError::NonFiniteVector {
                position,
                value: *value,
            });
        }
        Ok(vector.len())
    }
}

fn compare_neighbors(a: &Neighbor, b: &Neighbor) -> Ordering {
    a.distance
        .total_cmp(&b.distance)
        .then_with(|| a.ordinal.cmp(&b.ordinal))
}

pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_add_and_search() {
        let mut index = VectorStore::new(Some(3));

        assert_eq!(index.add(&[1.0, 0.0, 0.0]).unwrap(), 0);
        assert_eq!(index.add(&[0.9, 0.1, 0.0]).unwrap(), 1);
        assert_eq!(index.add(&[0.0, 1.0, 0.0]).unwrap(), 2);

        assert_eq!(index.len(), 3);

        let results = index.search(&[1.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(results.len(), 2);

        // Exact match first
        assert_eq!(results[0].ordinal, 0);
        assert!(results[0].distance.abs() < 1e-6);

        assert_eq!(results[1].ordinal, 1);
        assert!((results[1].distance - 0.02).abs() < 1e-5);
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut index = VectorStore::new(Some(3));
        let result = index.add(&[1.0, 0.0]);
        assert!(matches!(
            result,
            Err(VectorStoreError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));

        index.add(&[1.0, 0.0, 0.0]).unwrap();
        let result = index.add(&[1.0, 0.0, 0.0, 0.0]);
        assert!(matches!(
            result,
            Err(VectorStoreError::DimensionMismatch { .. })
        ));
        assert_eq!(index.len(), 1);

        let result = index.search(&[1.0, 0.0], 1);
        assert!(result.is_err());
    }

    #[test]
    fn first_insert_fixes_dimension() {
        let mut index = VectorStore::new(None);
        assert_eq!(index.dimension(), None);
        assert!(matches!(index.add(&[]), Err(VectorStoreError::EmptyVector)));
        assert_eq!(index.dimension(), None);

        index.add(&[0.5, 0.5]).unwrap();
        assert_eq!(index.dimension(), Some(2));
        assert!(index.add(&[0.5, 0.5, 0.5]).is_err());
    }

    #[test]
    fn empty_store_returns_no_neighbors() {
        let index = VectorStore::new(None);
        assert!(index.search(&[1.0, 2.0], 4).unwrap().is_empty());

        let index = VectorStore::new(Some(2));
        assert!(index.search(&[1.0, 2.0], 4).unwrap().is_empty());
    }

    #[test]
    fn ties_break_by_ordinal() {
        let mut index = VectorStore::new(Some(2));
        index.add(&[0.0, 1.0]).unwrap();
        index.add(&[1.0, 0.0]).unwrap();
        index.add(&[0.0, 1.0]).unwrap();
        index.add(&[0.0, 1.0]).unwrap();

        let results = index.search(&[0.0, 1.0], 3).unwrap();
        let ordinals: Vec<usize> = results.iter().map(|n| n.ordinal).collect();
        assert_eq!(ordinals, vec![0, 2, 3]);
    }

    #[test]
    fn replace_and_truncate() {
        let mut index = VectorStore::new(Some(2));
        index.add(&[1.0, 1.0]).unwrap();
        index.add(&[2.0, 2.0]).unwrap();

        index.replace(0, &[3.0, 3.0]).unwrap();
        assert_eq!(index.vector(0), Some(&[3.0f32, 3.0][..]));
        assert!(matches!(
            index.replace(5, &[1.0, 1.0]),
            Err(VectorStoreError::OutOfRange { ordinal: 5, len: 2 })
        ));

        index.truncate(1);
        assert_eq!(index.len(), 1);
        assert_eq!(index.vector(1), None);
        assert_eq!(index.as_slice(), &[3.0f32, 3.0][..]);
    }

    #[test]
    fn non_finite_vectors_are_rejected() {
        let mut index = VectorStore::new(None);
        assert!(matches!(
            index.add(&[f32::NAN, 0.0]),
            Err(VectorStoreError::NonFiniteVector { position: 0, .. })
        ));
        assert_eq!(index.dimension(), None);

        index.add(&[0.0, 1.0]).unwrap();
        assert!(matches!(
            index.add(&[0.0, f32::INFINITY]),
            Err(VectorStoreError::NonFiniteVector { position: 1, .. })
        ));
        assert!(matches!(
            index.add(&[-f32::NAN, 0.0]),
            Err(VectorStoreError::NonFiniteVector { .. })
        ));
        assert!(matches!(
            index.replace(0, &[f32::NEG_INFINITY, 0.0]),
            Err(VectorStoreError::NonFiniteVector { .. })
        ));
        assert_eq!(index.len(), 1);
        assert_eq!(index.vector(0), Some(&[0.0f32, 1.0][..]));

        let hits = index.search(&[0.0, 1.0], 1).unwrap();
        assert_eq!(hits[0].ordinal, 0);
        assert!(matches!(
            index.search(&[f32::INFINITY, 0.0], 1),
            Err(VectorStoreError::NonFiniteVector { .. })
        ));
    }

    #[test]
    fn zero_k_returns_nothing() {
        let mut index = VectorStore::new(Some(1));
        index.add(&[1.0]).unwrap();
        assert!(index.search(&[1.0], 0).unwrap().is_empty());
    }

    proptest! {
        #[test]
        fn search_is_bounded_and_ordered(
            rows in prop::collection::vec(prop::collection::vec(-4i8..4, 3), 0..40),
            query in prop::collection::vec(-4i8..4, 3),
            k in 0usize..50,
        ) {
            let mut index = VectorStore::new(Some(3));
            for row in &rows {
                let row: Vec<f32> = row.iter().map(|v| f32::from(*v)).collect();
                index.add(&row).unwrap();
            }
            let query: Vec<f32> = query.iter().map(|v| f32::from(*v)).collect();

            let results = index.search(&query, k).unwrap();
            prop_assert!(results.len() <= k);
            prop_assert_eq!(results.len(), k.min(rows.len()));
            for pair in results.windows(2) {
                prop_assert!(pair[0].distance <= pair[1].distance);
                if pair[0].distance == pair[1].distance {
                    prop_assert!(pair[0].ordinal < pair[1].ordinal);
                }
            }

            // Nothing left out is closer than the farthest returned hit.
            if let Some(last) = results.last() {
                for ordinal in 0..index.len() {
                    if results.iter().any(|n| n.ordinal == ordinal) {
                        continue;
                    }
                    let distance = squared_l2(&query, index.vector(ordinal).unwrap());
                    prop_assert!(
                        distance > last.distance
                            || (distance == last.distance && ordinal > last.ordinal)
                    );
                }
            }
        }
    }
}
