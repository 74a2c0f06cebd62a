use std::sync::Arc;

use ragline_core::{
    prelude::*,
    querying::{states, Query, TransformQuery},
    SparseEncoder,
};

/// Encodes the current query with a fitted sparse encoder.
///
/// Uses the query side weighting of the encoder, which differs from how documents are encoded.
#[derive(Clone)]
pub struct SparseEmbed {
    encoder: Arc<dyn SparseEncoder>,
}

impl std::fmt::Debug for SparseEmbed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SparseEmbed").finish_non_exhaustive()
    }
}

impl SparseEmbed {
    pub fn new(encoder: Arc<dyn SparseEncoder>) -> SparseEmbed {
        SparseEmbed { encoder }
    }

    pub fn from_encoder(encoder: impl SparseEncoder + 'static) -> SparseEmbed {
        SparseEmbed::new(Arc::new(encoder))
    }
}

#[async_trait]
impl TransformQuery for SparseEmbed {
    #[tracing::instrument(skip_all)]
    async fn transform_query(
        &self,
        mut query: Query<states::Pending>,
    ) -> Result<Query<states::Pending>> {
        let embedding = self.encoder.encode_query(query.current());

        if embedding.is_empty() {
            tracing::debug!("Query has no known terms, sparse side will not contribute");
        }

        query.sparse_embedding = Some(embedding);

        Ok(query)
    }
}

#[cfg(test)]
mod tests {
    use ragline_core::{MockSparseEncoder, SparseEmbedding};

    use super::*;

    #[tokio::test]
    async fn test_uses_query_encoding() {
        let mut encoder = MockSparseEncoder::new();
        encoder
            .expect_encode_query()
            .once()
            .returning(|_| SparseEmbedding {
                indices: vec![7],
                values: vec![1.0],
            });
        encoder.expect_encode_documents().never();

        let query = SparseEmbed::from_encoder(encoder)
            .transform_query(Query::from("cat"))
            .await
            .unwrap();

        assert_eq!(query.sparse_embedding.unwrap().indices, vec![7]);
    }

    #[tokio::test]
    async fn test_shared_encoder_uses_query_encoding() {
        let mut encoder = MockSparseEncoder::new();
        encoder
            .expect_encode_query()
            .once()
            .returning(|_| SparseEmbedding {
                indices: vec![3],
                values: vec![1.0],
            });
        encoder.expect_encode_queries().never();

        let query = SparseEmbed::from_encoder(Arc::new(encoder))
            .transform_query(Query::from("dog"))
            .await
            .unwrap();

        assert_eq!(query.sparse_embedding.unwrap().indices, vec![3]);
    }
}
