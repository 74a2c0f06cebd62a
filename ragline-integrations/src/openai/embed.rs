use async_openai::types::CreateEmbeddingRequestArgs;
use async_trait::async_trait;
use ragline_core::{errors::LanguageModelError, EmbeddingModel, Embeddings};

use super::{openai_error_to_language_model_error, OpenAI};

#[async_trait]
impl EmbeddingModel for OpenAI {
    #[tracing::instrument(skip_all, fields(num_chunks = input.len()), err)]
    async fn embed(&self, input: Vec<String>) -> Result<Embeddings, LanguageModelError> {
        let model = self
            .default_options
            .embed_model
            .as_ref()
            .ok_or_else(|| LanguageModelError::PermanentError("Model not set".into()))?;

        if input.is_empty() {
            return Ok(Vec::new());
        }

        let request = CreateEmbeddingRequestArgs::default()
            .model(model)
            .input(input)
            .build()
            .map_err(LanguageModelError::permanent)?;

        tracing::debug!(model = &model, "[Embed] Request to openai");
        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(openai_error_to_language_model_error)?;

        let mut data = response.data;
        data.sort_by_key(|embedding| embedding.index);

        tracing::debug!(num_embeddings = data.len(), "[Embed] Response openai");
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }

    fn name(&self) -> &'static str {
        "OpenAI"
    }
}

#[cfg(test)]
mod tests {
    use ragline_test_utils::{mock_embeddings, openai_client};
    use wiremock::MockServer;

    use super::*;

    #[test_log::test(tokio::test)]
    async fn test_embed_returns_error_when_model_missing() {
        let openai = OpenAI::builder().build().unwrap();
        let err = openai.embed(vec!["text".into()]).await.unwrap_err();
        assert!(matches!(err, LanguageModelError::PermanentError(_)));
    }

    #[test_log::test(tokio::test)]
    async fn test_embed_keeps_input_order() {
        let mock_server = MockServer::start().await;
        mock_embeddings(&mock_server, &[vec![1.0, 0.0], vec![0.0, 1.0]]).await;

        let openai = OpenAI::builder()
            .client(openai_client(&mock_server.uri()))
            .default_embed_model("text-embedding-3-large")
            .build()
            .unwrap();

        let embeddings = openai
            .embed(vec!["first".into(), "second".into()])
            .await
            .unwrap();

        assert_eq!(embeddings, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }
}
