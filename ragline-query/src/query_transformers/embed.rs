use std::sync::Arc;

use ragline_core::{
    prelude::*,
    querying::{states, Query, TransformQuery},
    EmbeddingModel,
};

/// Embeds the current query with a dense embedding model.
#[derive(Clone)]
pub struct Embed {
    embed_model: Arc<dyn EmbeddingModel>,
}

impl std::fmt::Debug for Embed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Embed")
            .field("embed_model", &self.embed_model.name())
            .finish()
    }
}

impl Embed {
    pub fn new(embed_model: Arc<dyn EmbeddingModel>) -> Embed {
        Embed { embed_model }
    }

    pub fn from_client(client: impl EmbeddingModel + 'static) -> Embed {
        Embed::new(Arc::new(client))
    }
}

#[async_trait]
impl TransformQuery for Embed {
    #[tracing::instrument(skip_all)]
    async fn transform_query(
        &self,
        mut query: Query<states::Pending>,
    ) -> Result<Query<states::Pending>> {
        let Some(embedding) = self
            .embed_model
            .embed(vec![query.current().to_string()])
            .await?
            .pop()
        else {
            anyhow::bail!("Failed to embed query")
        };

        query.embedding = Some(embedding);

        Ok(query)
    }
}

#[cfg(test)]
mod tests {
    use ragline_core::{test_utils::FakeEmbedder, LanguageModelError, MockEmbeddingModel};

    use super::*;

    #[tokio::test]
    async fn test_sets_embedding() {
        let embedder = FakeEmbedder::new(8);
        let expected = embedder.embed_one("the cat");

        let query = Embed::from_client(embedder.clone())
            .transform_query(Query::from("the cat"))
            .await
            .unwrap();

        assert_eq!(query.embedding, Some(expected));
        assert_eq!(embedder.calls(), vec![vec!["the cat".to_string()]]);
    }

    #[tokio::test]
    async fn test_propagates_model_errors() {
        let mut model = MockEmbeddingModel::new();
        model
            .expect_embed()
            .once()
            .returning(|_| Err(LanguageModelError::permanent("invalid api key")));

        let err = Embed::from_client(model)
            .transform_query(Query::from("the cat"))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("invalid api key"));
    }

    #[tokio::test]
    async fn test_empty_response_is_an_error() {
        let mut model = MockEmbeddingModel::new();
        model.expect_embed().once().returning(|_| Ok(vec![]));

        assert!(Embed::from_client(model)
            .transform_query(Query::from("the cat"))
            .await
            .is_err());
    }
}
