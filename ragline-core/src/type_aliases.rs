use serde::{Deserialize, Serialize};

pub type Embedding = Vec<f32>;
pub type Embeddings = Vec<Embedding>;

/// Lexical representation of a text: term indices paired with their weights.
///
/// Indices are unique within one embedding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseEmbedding {
    pub indices: Vec<u32>,
    pub values: Vec<f32>,
}
pub type SparseEmbeddings = Vec<SparseEmbedding>;

impl SparseEmbedding {
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Multiplies every weight by `factor`.
    #[must_use]
    pub fn scaled(mut self, factor: f32) -> Self {
        for value in &mut self.values {
            *value *= factor;
        }
        self
    }

    /// Dot product against another sparse embedding.
    pub fn dot(&self, other: &SparseEmbedding) -> f32 {
        self.indices
            .iter()
            .zip(&self.values)
            .filter_map(|(index, value)| {
                other
                    .indices
                    .iter()
                    .position(|other_index| other_index == index)
                    .map(|pos| value * other.values[pos])
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_dot_only_counts_shared_indices() {
        let a = SparseEmbedding {
            indices: vec![1, 2, 3],
            values: vec![1.0, 2.0, 3.0],
        };
        let b = SparseEmbedding {
            indices: vec![3, 4, 1],
            values: vec![0.5, 9.0, 2.0],
        };
        assert!((a.dot(&b) - (1.5 + 2.0)).abs() < 1e-6);
    }

    #[test]
    fn test_scaled() {
        let a = SparseEmbedding {
            indices: vec![7],
            values: vec![2.0],
        }
        .scaled(0.25);
        assert_eq!(a.values, vec![0.5]);
    }
}
