//! Integration with `OpenAI` compatible APIs for embeddings, completions and image description.
//!
//! Any endpoint speaking the `OpenAI` protocol works by pointing the client at its `api_base`.
//!
//! # Example
//!
//! ```no_run
//! # use ragline_integrations::{openai::{self, OpenAI}, transport::TransportConfig};
//! # use secrecy::SecretString;
//! # fn main() -> anyhow::Result<()> {
//! let client = openai::client(
//!     "https://api.openai.com/v1",
//!     &SecretString::from("sk-..."),
//!     &TransportConfig::default(),
//! )?;
//!
//! let openai = OpenAI::builder()
//!     .client(client)
//!     .default_embed_model("text-embedding-3-large")
//!     .default_prompt_model("gpt-4o-mini")
//!     .build()?;
//! # Ok(())
//! # }
//! ```
use std::sync::Arc;

use anyhow::Result;
use async_openai::{
    config::OpenAIConfig,
    error::{ApiError, OpenAIError},
};
use derive_builder::Builder;
use ragline_core::errors::LanguageModelError;
use secrecy::{ExposeSecret as _, SecretString};

use crate::transport::TransportConfig;

mod describe_image;
mod embed;
mod simple_prompt;

pub use async_openai::config::OpenAIConfig as Config;

/// Builds an `async_openai` client for `api_base` using the http client of `transport`.
///
/// The client's internal retries are disabled; wrap models in [`ragline_core::WithRetry`]
/// instead so a single policy governs every call.
///
/// # Errors
///
/// Errors if the http client cannot be built.
pub fn client(
    api_base: impl Into<String>,
    api_key: &SecretString,
    transport: &TransportConfig,
) -> Result<async_openai::Client<OpenAIConfig>> {
    let config = OpenAIConfig::new()
        .with_api_base(api_base)
        .with_api_key(api_key.expose_secret());

    let no_backoff = backoff::ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(std::time::Duration::ZERO))
        .build();

    Ok(async_openai::Client::with_config(config)
        .with_http_client(transport.http_client()?)
        .with_backoff(no_backoff))
}

#[derive(Debug, Builder, Clone)]
#[builder(setter(into, strip_option), build_fn(error = "anyhow::Error"))]
pub struct OpenAI {
    /// The `OpenAI` client, wrapped in an `Arc` for thread-safe reference counting.
    /// Defaults to a client reading `OPENAI_API_KEY` from the environment.
    #[builder(
        default = "Arc::new(async_openai::Client::<OpenAIConfig>::new())",
        setter(custom)
    )]
    client: Arc<async_openai::Client<OpenAIConfig>>,

    /// Default options for embedding, prompt and vision models.
    #[builder(default)]
    pub(crate) default_options: Options,
}

/// Models and sampling options used by the requests of an [`OpenAI`] client.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into, strip_option))]
pub struct Options {
    #[builder(default)]
    pub embed_model: Option<String>,
    #[builder(default)]
    pub prompt_model: Option<String>,
    #[builder(default)]
    pub vision_model: Option<String>,
    #[builder(default = "Some(DEFAULT_TEMPERATURE)")]
    pub temperature: Option<f32>,
    /// Upper bound on generated tokens for image descriptions.
    #[builder(default)]
    pub max_tokens: Option<u32>,
}

pub const DEFAULT_TEMPERATURE: f32 = 0.1;

impl Default for Options {
    fn default() -> Self {
        Self {
            embed_model: None,
            prompt_model: None,
            vision_model: None,
            temperature: Some(DEFAULT_TEMPERATURE),
            max_tokens: None,
        }
    }
}

impl Options {
    pub fn builder() -> OptionsBuilder {
        OptionsBuilder::default()
    }
}

impl OpenAI {
    pub fn builder() -> OpenAIBuilder {
        OpenAIBuilder::default()
    }

    pub fn options(&self) -> &Options {
        &self.default_options
    }
}

impl OpenAIBuilder {
    /// Sets the `async_openai` client, see [`client`].
    pub fn client(&mut self, client: async_openai::Client<OpenAIConfig>) -> &mut Self {
        self.client = Some(Arc::new(client));
        self
    }

    pub fn default_embed_model(&mut self, model: impl Into<String>) -> &mut Self {
        self.options_mut().embed_model = Some(model.into());
        self
    }

    pub fn default_prompt_model(&mut self, model: impl Into<String>) -> &mut Self {
        self.options_mut().prompt_model = Some(model.into());
        self
    }

    pub fn default_vision_model(&mut self, model: impl Into<String>) -> &mut Self {
        self.options_mut().vision_model = Some(model.into());
        self
    }

    pub fn temperature(&mut self, temperature: f32) -> &mut Self {
        self.options_mut().temperature = Some(temperature);
        self
    }

    fn options_mut(&mut self) -> &mut Options {
        self.default_options.get_or_insert_with(Options::default)
    }
}

/// Error body of an `OpenAI` compatible endpoint.
#[derive(Debug, serde::Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

/// Server errors reach us as an untyped [`ApiError`] whose message is the raw response body.
/// Unwraps the body if it is the usual `{"error": {...}}` envelope.
fn unwrap_error_body(api_error: ApiError) -> ApiError {
    if api_error.r#type.is_some() || api_error.code.is_some() {
        return api_error;
    }

    serde_json::from_str::<ErrorEnvelope>(&api_error.message)
        .map_or(api_error, |envelope| envelope.error)
}

/// Classifies an `async_openai` error.
///
/// Context length errors are reported as such. Rate limits, server errors, untyped errors (what
/// a 5xx response turns into), malformed responses and connection failures are transient.
/// Everything else is permanent.
pub fn openai_error_to_language_model_error(e: OpenAIError) -> LanguageModelError {
    match e {
        OpenAIError::ApiError(api_error) => {
            let api_error = unwrap_error_body(api_error);
            let code = api_error.code.as_deref().unwrap_or_default();
            let kind = api_error.r#type.as_deref().unwrap_or_default();

            if code == "context_length_exceeded" {
                LanguageModelError::ContextLengthExceeded(OpenAIError::ApiError(api_error).into())
            } else if kind == "insufficient_quota" || code == "insufficient_quota" {
                tracing::error!("OpenAI quota exceeded: {:?}", api_error);
                LanguageModelError::PermanentError(OpenAIError::ApiError(api_error).into())
            } else if kind == "server_error"
                || kind.is_empty() && code.is_empty()
                || kind == "rate_limit_exceeded"
                || code == "rate_limit_exceeded"
            {
                tracing::warn!("OpenAI API Server Error: {:?}", api_error);
                LanguageModelError::TransientError(OpenAIError::ApiError(api_error).into())
            } else {
                tracing::error!("OpenAI API Error: {:?}", api_error);
                LanguageModelError::PermanentError(OpenAIError::ApiError(api_error).into())
            }
        }
        OpenAIError::Reqwest(e) => match e.status() {
            Some(status) if status.is_client_error() && status.as_u16() != 429 => {
                tracing::error!("OpenAI API Client Error: {:?}", e);
                LanguageModelError::PermanentError(e.into())
            }
            _ => {
                tracing::warn!("OpenAI request failed: {:?}", e);
                LanguageModelError::TransientError(e.into())
            }
        },
        OpenAIError::JSONDeserialize(e) => {
            // The endpoint returned something that is not json, usually a proxy or gateway error
            tracing::error!("OpenAI response could not be deserialized: {:?}", e);
            LanguageModelError::TransientError(e.into())
        }
        e => {
            tracing::error!("OpenAI Error: {:?}", e);
            LanguageModelError::PermanentError(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(value: serde_json::Value) -> OpenAIError {
        OpenAIError::ApiError(serde_json::from_value(value).unwrap())
    }

    #[test]
    fn test_default_models() {
        let openai = OpenAI::builder()
            .default_embed_model("text-embedding-3-large")
            .default_prompt_model("gpt-4o-mini")
            .build()
            .unwrap();

        assert_eq!(
            openai.options().embed_model.as_deref(),
            Some("text-embedding-3-large")
        );
        assert_eq!(openai.options().prompt_model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(openai.options().vision_model, None);
        assert_eq!(openai.options().temperature, Some(DEFAULT_TEMPERATURE));
    }

    #[test]
    fn test_context_length_is_classified() {
        let error = api_error(serde_json::json!({
            "message": "too long",
            "type": "invalid_request_error",
            "param": null,
            "code": "context_length_exceeded"
        }));

        assert!(matches!(
            openai_error_to_language_model_error(error),
            LanguageModelError::ContextLengthExceeded(_)
        ));
    }

    #[test]
    fn test_raw_server_error_body_is_unwrapped() {
        let body = serde_json::json!({
            "error": {
                "message": "The server had an error while processing your request.",
                "type": "server_error",
                "param": null,
                "code": null
            }
        });
        let error = OpenAIError::ApiError(ApiError {
            message: body.to_string(),
            r#type: None,
            param: None,
            code: None,
        });

        assert!(openai_error_to_language_model_error(error).is_transient());
    }

    #[test]
    fn test_untyped_error_is_transient() {
        let error = OpenAIError::ApiError(ApiError {
            message: "<html>502 Bad Gateway</html>".to_string(),
            r#type: None,
            param: None,
            code: None,
        });

        assert!(openai_error_to_language_model_error(error).is_transient());
    }

    #[test]
    fn test_enveloped_invalid_request_is_permanent() {
        let body = serde_json::json!({
            "error": {
                "message": "bad",
                "type": "invalid_request_error",
                "param": null,
                "code": null
            }
        });
        let error = OpenAIError::ApiError(ApiError {
            message: body.to_string(),
            r#type: None,
            param: None,
            code: None,
        });

        assert!(matches!(
            openai_error_to_language_model_error(error),
            LanguageModelError::PermanentError(_)
        ));
    }

    #[test]
    fn test_server_error_is_transient() {
        let error = api_error(serde_json::json!({
            "message": "boom",
            "type": "server_error",
            "param": null,
            "code": null
        }));

        assert!(openai_error_to_language_model_error(error).is_transient());
    }
}
