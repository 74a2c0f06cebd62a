use ragline_core::{
    prelude::*,
    querying::{search_strategies::HybridSearch, states, Query, Retrieve},
    vector_store::{IndexHandle, IndexSpec},
    HybridIndex,
};

/// Retrieves from a [`HybridIndex`] with the [`HybridSearch`] strategy.
///
/// Expects both a dense and a sparse embedding on the query, see
/// [`crate::query_transformers::Embed`] and [`crate::query_transformers::SparseEmbed`].
#[derive(Debug, Clone)]
pub struct HybridRetriever {
    index: HybridIndex,
    handle: IndexHandle,
}

impl HybridRetriever {
    pub fn new(index: HybridIndex, handle: IndexHandle) -> Self {
        Self { index, handle }
    }

    /// Connects to the index described by `spec`, creating it when missing.
    ///
    /// # Errors
    ///
    /// Errors if the index cannot be listed or created, or if an existing index has a different
    /// dimension.
    pub async fn connect(index: HybridIndex, spec: &IndexSpec) -> Result<Self> {
        let handle = index.ensure(spec).await?;
        Ok(Self::new(index, handle))
    }

    pub fn handle(&self) -> &IndexHandle {
        &self.handle
    }
}

#[async_trait]
impl Retrieve<HybridSearch> for HybridRetriever {
    #[tracing::instrument(skip_all, fields(index = %self.handle.name, alpha = search_strategy.alpha(), top_k = search_strategy.top_k()))]
    async fn retrieve(
        &self,
        search_strategy: &HybridSearch,
        mut query: Query<states::Pending>,
    ) -> Result<Query<states::Retrieved>> {
        let Some(dense) = query.embedding.clone() else {
            anyhow::bail!("No embedding for query")
        };

        let Some(sparse) = query.sparse_embedding.take() else {
            anyhow::bail!("No sparse embedding for query")
        };

        let documents = self
            .index
            .query_vectors(
                &self.handle,
                dense,
                sparse.clone(),
                search_strategy.alpha(),
                search_strategy.top_k(),
            )
            .await
            .context("Failed to retrieve from hybrid index")?;

        tracing::debug!(documents = documents.len(), "Retrieved documents");

        query.sparse_embedding = Some(sparse);
        Ok(query.retrieved_documents(documents))
    }
}
