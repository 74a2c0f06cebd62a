use async_openai::types::{
    ChatCompletionRequestMessageContentPartImage, ChatCompletionRequestMessageContentPartText,
    ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContent,
    ChatCompletionRequestUserMessageContentPart, CreateChatCompletionRequestArgs, ImageUrlArgs,
};
use async_trait::async_trait;
use ragline_core::{
    errors::LanguageModelError,
    indexing_traits::{DescribeImage, ImageData},
    prompt::Prompt,
};

use super::{openai_error_to_language_model_error, OpenAI};

#[async_trait]
impl DescribeImage for OpenAI {
    /// Sends the prompt and the image as one multimodal user message to the vision model.
    #[tracing::instrument(skip_all, fields(mime_type = %image.mime_type), err)]
    async fn describe_image(
        &self,
        prompt: Prompt,
        image: ImageData,
    ) -> Result<String, LanguageModelError> {
        let model = self
            .default_options
            .vision_model
            .as_ref()
            .ok_or_else(|| LanguageModelError::PermanentError("Vision model not set".into()))?;

        let image_url = ImageUrlArgs::default()
            .url(image.to_data_url())
            .build()
            .map_err(LanguageModelError::permanent)?;

        let content = ChatCompletionRequestUserMessageContent::Array(vec![
            ChatCompletionRequestUserMessageContentPart::Text(
                ChatCompletionRequestMessageContentPartText {
                    text: prompt.render()?,
                },
            ),
            ChatCompletionRequestUserMessageContentPart::ImageUrl(
                ChatCompletionRequestMessageContentPartImage { image_url },
            ),
        ]);

        let mut request = CreateChatCompletionRequestArgs::default();
        request.model(model).messages(vec![
            ChatCompletionRequestUserMessageArgs::default()
                .content(content)
                .build()
                .map_err(LanguageModelError::permanent)?
                .into(),
        ]);
        if let Some(temperature) = self.default_options.temperature {
            request.temperature(temperature);
        }
        if let Some(max_tokens) = self.default_options.max_tokens {
            request.max_completion_tokens(max_tokens);
        }
        let request = request.build().map_err(LanguageModelError::permanent)?;

        tracing::debug!(model = &model, "[DescribeImage] Request to openai");

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(openai_error_to_language_model_error)?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LanguageModelError::PermanentError("Expected content in response".into()))
    }
}

#[cfg(test)]
mod tests {
    use ragline_test_utils::{mock_chat_completion, openai_client};
    use wiremock::{
        matchers::{body_string_contains, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;

    #[test_log::test(tokio::test)]
    async fn test_sends_image_as_data_url() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_string_contains("data:image/png;base64,aGVsbG8="))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                ragline_test_utils::chat_completion_body("A red square on white."),
            ))
            .expect(1)
            .mount(&mock_server)
            .await;

        let openai = OpenAI::builder()
            .client(openai_client(&mock_server.uri()))
            .default_vision_model("gpt-4o")
            .build()
            .unwrap();

        let description = openai
            .describe_image(
                "Describe this image".into(),
                ImageData::new("image/png", "aGVsbG8="),
            )
            .await
            .unwrap();

        assert_eq!(description, "A red square on white.");
    }

    #[test_log::test(tokio::test)]
    async fn test_requires_vision_model() {
        let mock_server = MockServer::start().await;
        mock_chat_completion(&mock_server, "unused").await;

        let openai = OpenAI::builder()
            .client(openai_client(&mock_server.uri()))
            .default_prompt_model("gpt-4o-mini")
            .build()
            .unwrap();

        let err = openai
            .describe_image("Describe".into(), ImageData::new("image/png", "AA=="))
            .await
            .unwrap_err();

        assert!(matches!(err, LanguageModelError::PermanentError(_)));
    }
}
