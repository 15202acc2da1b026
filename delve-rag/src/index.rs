//! Exact nearest-neighbor index under squared Euclidean distance

use delve_core::{DelveError, DelveResult, ErrorContext, VectorIndex};

/// Flat in-memory index storing every vector contiguously.
///
/// Search is a linear scan, which is exact and fine for assistant-sized memory.
#[derive(Debug, Clone)]
pub struct FlatL2Index {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatL2Index {
    /// Create a new index for vectors of `dimension` components
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            data: Vec::new(),
        }
    }

    /// Stored vector at `position`
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        let start = position.checked_mul(self.dimension)?;
        self.data.get(start..start + self.dimension)
    }

    fn check_dimension(&self, vector: &[f32], operation: &str) -> DelveResult<()> {
        if vector.len() != self.dimension {
            return Err(DelveError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
                context: ErrorContext::new("flat_l2_index").with_operation(operation),
            });
        }
        Ok(())
    }
}

impl VectorIndex for FlatL2Index {
    fn add(&mut self, vector: &[f32]) -> DelveResult<()> {
        self.check_dimension(vector, "add")?;
        self.data.extend_from_slice(vector);
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> DelveResult<(Vec<f32>, Vec<usize>)> {
        self.check_dimension(query, "search")?;
        if self.dimension == 0 {
            return Ok((Vec::new(), Vec::new()));
        }

        let mut scored: Vec<(usize, f32)> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(position, stored)| (position, squared_l2(query, stored)))
            .collect();

        // Stable sort keeps insertion order among equal distances
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.truncate(k);

        Ok(scored.into_iter().map(|(p, d)| (d, p)).unzip())
    }

    fn remove_oldest(&mut self) -> bool {
        if self.data.is_empty() {
            return false;
        }
        self.data.drain(..self.dimension);
        true
    }

    fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Squared Euclidean distance between two equal-length vectors
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_squared_l2() {
        assert_eq!(squared_l2(&[1.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(squared_l2(&[0.0, 0.0], &[3.0, 4.0]), 25.0);
    }

    #[test]
    fn test_search_orders_by_distance() {
        let mut index = FlatL2Index::new(2);
        index.add(&[10.0, 10.0]).unwrap();
        index.add(&[1.0, 0.0]).unwrap();
        index.add(&[0.0, 0.0]).unwrap();

        let (distances, positions) = index.search(&[0.0, 0.0], 2).unwrap();
        assert_eq!(positions, vec![2, 1]);
        assert_eq!(distances, vec![0.0, 1.0]);
    }

    #[test]
    fn test_search_with_large_k_returns_everything() {
        let mut index = FlatL2Index::new(1);
        index.add(&[1.0]).unwrap();
        index.add(&[2.0]).unwrap();

        let (_, positions) = index.search(&[0.0], 10).unwrap();
        assert_eq!(positions, vec![0, 1]);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let mut index = FlatL2Index::new(1);
        index.add(&[1.0]).unwrap();
        index.add(&[-1.0]).unwrap();

        let (_, positions) = index.search(&[0.0], 2).unwrap();
        assert_eq!(positions, vec![0, 1]);
    }

    #[test]
    fn test_nan_vectors_do_not_disturb_ranking() {
        let mut index = FlatL2Index::new(1);
        index.add(&[1.0]).unwrap();
        index.add(&[f32::NAN]).unwrap();
        index.add(&[0.5]).unwrap();

        let (_, positions) = index.search(&[0.0], 3).unwrap();
        assert_eq!(positions.len(), 3);
        let finite: Vec<_> = positions.into_iter().filter(|&p| p != 1).collect();
        assert_eq!(finite, vec![2, 0]);
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let mut index = FlatL2Index::new(3);
        let err = index.add(&[1.0, 2.0]).unwrap_err();
        assert!(matches!(
            err,
            DelveError::DimensionMismatch {
                expected: 3,
                actual: 2,
                ..
            }
        ));
        assert!(index.is_empty());
        assert!(index.search(&[1.0], 1).is_err());
    }

    #[test]
    fn test_remove_oldest_shifts_positions() {
        let mut index = FlatL2Index::new(2);
        index.add(&[0.0, 0.0]).unwrap();
        index.add(&[5.0, 5.0]).unwrap();

        assert!(index.remove_oldest());
        assert_eq!(index.len(), 1);
        assert_eq!(index.vector(0), Some(&[5.0, 5.0][..]));

        assert!(index.remove_oldest());
        assert!(!index.remove_oldest());
    }
}
