use std::{path::Path, sync::Arc};

use anyhow::{Context as _, Result};
use derive_builder::Builder;
use ragline_core::{
    hybrid_index::DEFAULT_BATCH_SIZE, vector_store::IndexSpec, EmbeddingModel, FileKind,
    HybridIndex, VectorStore,
};
use ragline_integrations::bm25::SparseEncoderStore;
use serde::Serialize;

use crate::{
    chunkers::{SemanticChunker, DEFAULT_BREAKPOINT_PERCENTILE},
    loaders::DocumentLoader,
};

/// Outcome of a pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexingReport {
    /// Index the chunks were written to
    pub index: String,
    pub chunks: usize,
    pub upserted: usize,
    /// Whether the fitted sparse encoder state was written. If not, retrieval processes will
    /// fail to start until indexing succeeds again.
    pub sparse_state_persisted: bool,
}

impl IndexingReport {
    /// True if nothing was indexed because the document produced no chunks.
    pub fn is_empty(&self) -> bool {
        self.chunks == 0
    }
}

/// Indexes a single document for hybrid retrieval.
///
/// load → chunk (semantic for PDF pages, one chunk per CSV row) → fit and persist the BM25
/// encoder on the chunks → ensure the index → embed and upsert.
///
/// # Example
///
/// ```no_run
/// # use std::sync::Arc;
/// # use ragline_core::{vector_store::{IndexSpec, Metric}, EmbeddingModel, VectorStore};
/// # use ragline_indexing::Pipeline;
/// # use ragline_integrations::bm25::SparseEncoderStore;
/// # async fn run(store: Arc<dyn VectorStore>, embed: Arc<dyn EmbeddingModel>) -> anyhow::Result<()> {
/// let report = Pipeline::builder()
///     .store(store)
///     .embed_model(embed)
///     .index_spec(IndexSpec::new("rag-agent", 3072, Metric::Dotproduct))
///     .sparse_store(SparseEncoderStore::new("data/bm25_values.json"))
///     .build()?
///     .run("docs/handbook.pdf")
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Builder)]
#[builder(setter(into), build_fn(error = "anyhow::Error"))]
pub struct Pipeline {
    store: Arc<dyn VectorStore>,
    embed_model: Arc<dyn EmbeddingModel>,
    index_spec: IndexSpec,
    sparse_store: SparseEncoderStore,
    #[builder(default = "DEFAULT_BREAKPOINT_PERCENTILE")]
    breakpoint_percentile: f32,
    #[builder(default = "DEFAULT_BATCH_SIZE")]
    batch_size: usize,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("store", &self.store.name())
            .field("embed_model", &self.embed_model.name())
            .field("index_spec", &self.index_spec)
            .field("sparse_store", &self.sparse_store)
            .finish()
    }
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Runs the pipeline on the document at `path`.
    ///
    /// A document without any chunks is not an error; nothing is fitted or written and the
    /// returned report is empty.
    ///
    /// # Errors
    ///
    /// Errors if the document cannot be loaded or chunked, or if indexing fails. Failing to
    /// persist the sparse encoder is not an error, see [`IndexingReport::sparse_state_persisted`].
    #[tracing::instrument(skip_all, name = "indexing_pipeline.run", fields(path = %path.as_ref().display()))]
    pub async fn run(&self, path: impl AsRef<Path>) -> Result<IndexingReport> {
        let document = DocumentLoader::load(path.as_ref())?;

        let chunks = match document.kind {
            FileKind::Pdf => SemanticChunker::new(self.embed_model.clone())
                .with_breakpoint_percentile(self.breakpoint_percentile)
                .chunk_all(document.chunks)
                .await
                .context("Failed to chunk document")?,
            _ => document.chunks,
        };

        if chunks.is_empty() {
            tracing::warn!("No chunks were created, indexing aborted");
            return Ok(IndexingReport {
                index: self.index_spec.name.clone(),
                ..IndexingReport::default()
            });
        }

        tracing::info!(chunks = chunks.len(), "Fitting sparse encoder");
        let texts = chunks
            .iter()
            .map(|chunk| chunk.text.as_str())
            .collect::<Vec<_>>();
        let fitted = self.sparse_store.fit_and_persist(&texts).await?;

        if !fitted.persisted {
            tracing::warn!(
                path = %self.sparse_store.path().display(),
                "Continuing without a persisted sparse encoder. Retrieval will fail to start \
                 until the state is written successfully"
            );
        }

        let index = HybridIndex::new(
            self.store.clone(),
            self.embed_model.clone(),
            Arc::new(fitted.encoder),
        )
        .with_batch_size(self.batch_size);

        let handle = index.ensure(&self.index_spec).await?;
        let upserted = index.add_chunks(&handle, &chunks).await?;

        Ok(IndexingReport {
            index: handle.name,
            chunks: chunks.len(),
            upserted,
            sparse_state_persisted: fitted.persisted,
        })
    }
}
