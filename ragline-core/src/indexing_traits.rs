//! Traits for the models used while indexing and querying.
//!
//! Implementations live in `ragline-integrations`; decorators such as
//! [`crate::retry::WithRetry`] wrap any implementation.
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    errors::LanguageModelError, prompt::Prompt, Embeddings, SparseEmbedding, SparseEmbeddings,
};

#[cfg(feature = "test-utils")]
#[doc(hidden)]
use mockall::automock;

/// Produces dense embeddings for a batch of texts, one per input, in order.
#[cfg_attr(feature = "test-utils", automock)]
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    async fn embed(&self, input: Vec<String>) -> Result<Embeddings, LanguageModelError>;

    fn name(&self) -> &'static str {
        let name = std::any::type_name::<Self>();
        name.split("::").last().unwrap_or(name)
    }
}

#[async_trait]
impl<T: EmbeddingModel + ?Sized> EmbeddingModel for Arc<T> {
    async fn embed(&self, input: Vec<String>) -> Result<Embeddings, LanguageModelError> {
        self.as_ref().embed(input).await
    }

    fn name(&self) -> &'static str {
        self.as_ref().name()
    }
}

/// A fitted lexical encoder.
///
/// Documents and queries are weighted differently (term frequency saturation for documents,
/// inverse document frequency for queries), hence the two methods.
#[cfg_attr(feature = "test-utils", automock)]
pub trait SparseEncoder: Send + Sync {
    fn encode_documents(&self, texts: &[String]) -> SparseEmbeddings;

    fn encode_queries(&self, texts: &[String]) -> SparseEmbeddings;

    fn encode_query(&self, text: &str) -> SparseEmbedding;
}

impl<T: SparseEncoder + ?Sized> SparseEncoder for Arc<T> {
    fn encode_documents(&self, texts: &[String]) -> SparseEmbeddings {
        self.as_ref().encode_documents(texts)
    }

    fn encode_queries(&self, texts: &[String]) -> SparseEmbeddings {
        self.as_ref().encode_queries(texts)
    }

    fn encode_query(&self, text: &str) -> SparseEmbedding {
        self.as_ref().encode_query(text)
    }
}

/// Given a prompt, queries an llm and returns the completion
#[cfg_attr(feature = "test-utils", automock)]
#[async_trait]
pub trait SimplePrompt: Send + Sync {
    async fn prompt(&self, prompt: Prompt) -> Result<String, LanguageModelError>;

    fn name(&self) -> &'static str {
        let name = std::any::type_name::<Self>();
        name.split("::").last().unwrap_or(name)
    }
}

#[async_trait]
impl<T: SimplePrompt + ?Sized> SimplePrompt for Arc<T> {
    async fn prompt(&self, prompt: Prompt) -> Result<String, LanguageModelError> {
        self.as_ref().prompt(prompt).await
    }

    fn name(&self) -> &'static str {
        self.as_ref().name()
    }
}

/// An image, base64 encoded, ready to be sent to a multimodal model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageData {
    pub mime_type: String,
    pub base64: String,
}

impl ImageData {
    pub fn new(mime_type: impl Into<String>, base64: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            base64: base64.into(),
        }
    }

    /// Renders the image as a `data:` url
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }
}

/// Asks a multimodal model to describe an image.
#[cfg_attr(feature = "test-utils", automock)]
#[async_trait]
pub trait DescribeImage: Send + Sync {
    async fn describe_image(
        &self,
        prompt: Prompt,
        image: ImageData,
    ) -> Result<String, LanguageModelError>;
}

#[async_trait]
impl<T: DescribeImage + ?Sized> DescribeImage for Arc<T> {
    async fn describe_image(
        &self,
        prompt: Prompt,
        image: ImageData,
    ) -> Result<String, LanguageModelError> {
        self.as_ref().describe_image(prompt, image).await
    }
}
