use derive_builder::Builder;

use crate::{errors::IndexError, hybrid_index::check_alpha, query_traits::SearchStrategy};

use super::{DEFAULT_ALPHA, DEFAULT_TOP_K};

/// A hybrid search strategy blending a dense similarity search with a sparse keyword search.
///
/// `alpha` weighs the dense side, `1 - alpha` the sparse side. Defaults to an even blend and a
/// maximum of 3 documents.
#[derive(Debug, Clone, Copy, PartialEq, Builder)]
#[builder(setter(into), build_fn(validate = "Self::validate", error = "anyhow::Error"))]
pub struct HybridSearch {
    /// Weight of the dense similarity, within `[0, 1]`
    #[builder(default = "DEFAULT_ALPHA")]
    alpha: f32,
    /// Maximum number of documents to return
    #[builder(default = "DEFAULT_TOP_K")]
    top_k: usize,
}

impl SearchStrategy for HybridSearch {}

impl Default for HybridSearch {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            top_k: DEFAULT_TOP_K,
        }
    }
}

impl HybridSearch {
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidAlpha`] if `alpha` is outside `[0, 1]`.
    pub fn new(alpha: f32, top_k: usize) -> Result<Self, IndexError> {
        Ok(Self {
            alpha: check_alpha(alpha)?,
            top_k,
        })
    }

    pub fn builder() -> HybridSearchBuilder {
        HybridSearchBuilder::default()
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Sets the maximum amount of documents retrieved
    pub fn with_top_k(&mut self, top_k: usize) -> &mut Self {
        self.top_k = top_k;
        self
    }
}

impl HybridSearchBuilder {
    fn validate(&self) -> Result<(), IndexError> {
        if let Some(alpha) = self.alpha {
            check_alpha(alpha)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let strategy = HybridSearch::default();
        assert!((strategy.alpha() - 0.5).abs() < f32::EPSILON);
        assert_eq!(strategy.top_k(), 3);
    }

    #[test]
    fn test_builder_rejects_invalid_alpha() {
        assert!(HybridSearch::builder().alpha(1.2_f32).build().is_err());
        assert_eq!(
            HybridSearch::builder().alpha(0.0_f32).top_k(5_usize).build().unwrap(),
            HybridSearch::new(0.0, 5).unwrap()
        );
    }
}
