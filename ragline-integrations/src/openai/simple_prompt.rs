use async_openai::types::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs};
use async_trait::async_trait;
use ragline_core::{
    errors::LanguageModelError, prompt::Prompt, util::debug_long_utf8, SimplePrompt,
};

use super::{openai_error_to_language_model_error, OpenAI};

#[async_trait]
impl SimplePrompt for OpenAI {
    /// Sends the rendered prompt as a single user message and returns the first choice.
    ///
    /// # Errors
    ///
    /// - Returns a permanent error if no prompt model is configured or the prompt fails to
    ///   render.
    /// - Returns the classified `OpenAI` error if the request fails.
    #[tracing::instrument(skip_all, err)]
    async fn prompt(&self, prompt: Prompt) -> Result<String, LanguageModelError> {
        let model = self
            .default_options
            .prompt_model
            .as_ref()
            .ok_or_else(|| LanguageModelError::PermanentError("Model not set".into()))?;

        let rendered = prompt.render()?;

        let mut request = CreateChatCompletionRequestArgs::default();
        request.model(model).messages(vec![
            ChatCompletionRequestUserMessageArgs::default()
                .content(rendered.as_str())
                .build()
                .map_err(LanguageModelError::permanent)?
                .into(),
        ]);
        if let Some(temperature) = self.default_options.temperature {
            request.temperature(temperature);
        }
        let request = request.build().map_err(LanguageModelError::permanent)?;

        tracing::trace!(
            model = &model,
            prompt = debug_long_utf8(&rendered, 100),
            "[SimplePrompt] Request to openai"
        );

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(openai_error_to_language_model_error)?;

        let message = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                LanguageModelError::PermanentError("Expected content in response".into())
            })?;

        tracing::trace!(
            response = debug_long_utf8(&message, 100),
            "[SimplePrompt] Response from openai"
        );

        Ok(message)
    }

    fn name(&self) -> &'static str {
        "OpenAI"
    }
}

#[cfg(test)]
mod tests {
    use ragline_test_utils::{mock_chat_completion, mock_chat_error, openai_client};
    use wiremock::MockServer;

    use super::*;

    fn openai(server: &MockServer) -> OpenAI {
        OpenAI::builder()
            .client(openai_client(&server.uri()))
            .default_prompt_model("gpt-4o-mini")
            .build()
            .unwrap()
    }

    #[test_log::test(tokio::test)]
    async fn test_prompt_returns_first_choice() {
        let mock_server = MockServer::start().await;
        mock_chat_completion(&mock_server, "The cat sat on the mat.").await;

        let answer = openai(&mock_server)
            .prompt("Where did the cat sit?".into())
            .await
            .unwrap();

        assert_eq!(answer, "The cat sat on the mat.");
    }

    #[test_log::test(tokio::test)]
    async fn test_server_errors_are_transient() {
        let mock_server = MockServer::start().await;
        mock_chat_error(&mock_server, 500, "server_error").await;

        let err = openai(&mock_server)
            .prompt("hello".into())
            .await
            .unwrap_err();

        assert!(err.is_transient(), "{err:?}");
    }

    #[test_log::test(tokio::test)]
    async fn test_invalid_requests_are_permanent() {
        let mock_server = MockServer::start().await;
        mock_chat_error(&mock_server, 400, "invalid_request_error").await;

        let err = openai(&mock_server)
            .prompt("hello".into())
            .await
            .unwrap_err();

        assert!(matches!(err, LanguageModelError::PermanentError(_)));
    }
}
