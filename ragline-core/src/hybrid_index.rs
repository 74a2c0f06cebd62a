//! Lifecycle of a hybrid (dense + sparse) index on a [`VectorStore`].
//!
//! - [`HybridIndex::ensure`] creates the index when absent and otherwise reuses it after checking
//!   its dimension.
//! - [`HybridIndex::add_chunks`] embeds and upserts chunks in batches. Records are keyed by
//!   [`Chunk::id`], so re-running the same input overwrites instead of duplicating. Upserts are
//!   at-least-once: a failing batch leaves the previous batches in place.
//! - [`HybridIndex::hybrid_query`] blends dense and sparse similarity with `alpha`.
use std::sync::Arc;

use crate::{
    chunk::Chunk,
    errors::IndexError,
    indexing_traits::{EmbeddingModel, SparseEncoder},
    vector_store::{IndexHandle, IndexSpec, ScoredChunk, VectorQuery, VectorRecord, VectorStore},
    Embedding, SparseEmbedding,
};

pub const DEFAULT_BATCH_SIZE: usize = 32;

/// Validates that `alpha` lies within `[0, 1]`.
///
/// # Errors
///
/// Returns [`IndexError::InvalidAlpha`] otherwise, including for NaN.
pub fn check_alpha(alpha: f32) -> Result<f32, IndexError> {
    if (0.0..=1.0).contains(&alpha) {
        Ok(alpha)
    } else {
        Err(IndexError::InvalidAlpha(alpha))
    }
}

/// Convex combination of a dense and a sparse query vector.
///
/// The dense vector is scaled by `alpha` and the sparse vector by `1 - alpha`. At `alpha == 1`
/// the sparse vector is dropped entirely, so the search is purely dense.
///
/// # Errors
///
/// Returns [`IndexError::InvalidAlpha`] if `alpha` is outside `[0, 1]`.
pub fn hybrid_scale(
    dense: Embedding,
    sparse: SparseEmbedding,
    alpha: f32,
) -> Result<(Embedding, Option<SparseEmbedding>), IndexError> {
    let alpha = check_alpha(alpha)?;

    let dense = dense.into_iter().map(|v| v * alpha).collect();

    #[allow(clippy::float_cmp)]
    let sparse = if alpha == 1.0 || sparse.is_empty() {
        None
    } else {
        Some(sparse.scaled(1.0 - alpha))
    };

    Ok((dense, sparse))
}

#[derive(Clone)]
pub struct HybridIndex {
    store: Arc<dyn VectorStore>,
    embed_model: Arc<dyn EmbeddingModel>,
    sparse_encoder: Arc<dyn SparseEncoder>,
    batch_size: usize,
}

impl std::fmt::Debug for HybridIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HybridIndex")
            .field("store", &self.store.name())
            .field("embed_model", &self.embed_model.name())
            .field("batch_size", &self.batch_size)
            .finish()
    }
}

impl HybridIndex {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embed_model: Arc<dyn EmbeddingModel>,
        sparse_encoder: Arc<dyn SparseEncoder>,
    ) -> Self {
        Self {
            store,
            embed_model,
            sparse_encoder,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Number of chunks embedded and upserted per request. Zero is treated as one.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Returns a handle to the index described by `spec`, creating it if it does not exist.
    ///
    /// An existing index is never modified.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::DimensionMismatch`] if an existing index has a different dimension
    /// than `spec`. A differing metric is only logged.
    #[tracing::instrument(skip_all, fields(index = %spec.name), err)]
    pub async fn ensure(&self, spec: &IndexSpec) -> Result<IndexHandle, IndexError> {
        let existing = self.store.list_indexes().await?;

        if !existing.iter().any(|name| name == &spec.name) {
            tracing::info!(
                dimension = spec.dimension,
                metric = %spec.metric,
                "Index not found, creating"
            );
            return Ok(self.store.create_index(spec).await?);
        }

        let handle = self.store.describe_index(&spec.name).await?;

        if handle.dimension != spec.dimension {
            return Err(IndexError::DimensionMismatch {
                name: spec.name.clone(),
                expected: spec.dimension,
                actual: handle.dimension,
            });
        }

        if handle.metric != spec.metric {
            tracing::warn!(
                existing = %handle.metric,
                requested = %spec.metric,
                "Reusing index with a different metric than configured"
            );
        }

        tracing::debug!("Reusing existing index");
        Ok(handle)
    }

    /// Embeds and upserts `chunks`, returning the number of records written.
    ///
    /// # Errors
    ///
    /// Fails on the first batch that cannot be embedded or upserted. Earlier batches stay
    /// written.
    #[tracing::instrument(skip_all, fields(index = %index.name, chunks = chunks.len()), err)]
    pub async fn add_chunks(
        &self,
        index: &IndexHandle,
        chunks: &[Chunk],
    ) -> Result<usize, IndexError> {
        let mut upserted = 0;

        for batch in chunks.chunks(self.batch_size.max(1)) {
            let texts = batch
                .iter()
                .map(|chunk| chunk.text.clone())
                .collect::<Vec<_>>();

            let dense = self.embed_model.embed(texts.clone()).await?;
            if dense.len() != batch.len() {
                return Err(IndexError::EmbeddingCount {
                    expected: batch.len(),
                    actual: dense.len(),
                });
            }

            let sparse = self.sparse_encoder.encode_documents(&texts);

            let records = batch
                .iter()
                .zip(dense)
                .zip(sparse.into_iter().map(Some).chain(std::iter::repeat(None)))
                .map(|((chunk, values), sparse_values)| VectorRecord {
                    id: chunk.id().to_string(),
                    values,
                    sparse_values: sparse_values.filter(|s| !s.is_empty()),
                    chunk: chunk.clone(),
                })
                .collect::<Vec<_>>();

            self.store.upsert(index, records).await?;
            upserted += batch.len();

            tracing::debug!(upserted, total = chunks.len(), "Upserted batch");
        }

        tracing::info!(upserted, "Added chunks to index");
        Ok(upserted)
    }

    /// Embeds `query` both ways and runs a blended search.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidAlpha`] before any remote call if `alpha` is outside
    /// `[0, 1]`.
    #[tracing::instrument(skip(self, index), fields(index = %index.name), err)]
    pub async fn hybrid_query(
        &self,
        index: &IndexHandle,
        query: &str,
        alpha: f32,
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, IndexError> {
        check_alpha(alpha)?;

        let dense = self
            .embed_model
            .embed(vec![query.to_string()])
            .await?
            .pop()
            .ok_or(IndexError::EmbeddingCount {
                expected: 1,
                actual: 0,
            })?;
        let sparse = self.sparse_encoder.encode_query(query);

        self.query_vectors(index, dense, sparse, alpha, top_k).await
    }

    /// Blended search with precomputed query vectors.
    ///
    /// Results are ordered by descending score. Equal scores keep the order the store returned
    /// them in.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidAlpha`] if `alpha` is outside `[0, 1]`, or the store error.
    pub async fn query_vectors(
        &self,
        index: &IndexHandle,
        dense: Embedding,
        sparse: SparseEmbedding,
        alpha: f32,
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, IndexError> {
        let (vector, sparse_vector) = hybrid_scale(dense, sparse, alpha)?;

        let mut results = self
            .store
            .query(
                index,
                VectorQuery {
                    vector,
                    sparse_vector,
                    top_k,
                },
            )
            .await?;

        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(top_k);

        Ok(results)
    }
}
