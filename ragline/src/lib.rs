//! # ragline
//!
//! Hybrid dense and sparse retrieval augmented generation over Pinecone and any `OpenAI`
//! compatible endpoint.
//!
//! - [`indexing`] loads PDF and CSV documents, chunks them semantically, fits a BM25 encoder on
//!   the chunks and upserts dense and sparse vectors into a hybrid index.
//! - [`query`] embeds a question both ways, retrieves with an alpha weighted hybrid search and
//!   answers from the retrieved context. Answers can be collected for evaluation and graded by
//!   an LLM judge.
//! - [`media`] describes images, transcribes audio and summarizes video.
//!
//! The `ragline-index`, `ragline-chat` and `ragline-media` binaries wire these together from
//! [`Settings`].
//!
//! ## Querying
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use ragline::{query::{self, answers, query_transformers, HybridRetriever}, traits::*};
//! # async fn run(
//! #     embed: Arc<dyn EmbeddingModel>,
//! #     sparse: Arc<dyn SparseEncoder>,
//! #     prompt: Arc<dyn SimplePrompt>,
//! #     retriever: HybridRetriever,
//! # ) -> anyhow::Result<()> {
//! let answer = query::Pipeline::default()
//!     .then_transform_query(query_transformers::Embed::new(embed))
//!     .then_transform_query(query_transformers::SparseEmbed::new(sparse))
//!     .then_retrieve(retriever)
//!     .then_answer(answers::Simple::new(prompt))
//!     .query("What is chunking?")
//!     .await?;
//! # Ok(())
//! # }
//! ```
pub mod cli;
pub mod config;
pub mod services;
pub mod telemetry;

pub use config::Settings;

#[doc(inline)]
pub use ragline_core::prompt;
#[doc(inline)]
pub use ragline_core::retry;
#[doc(inline)]
pub use ragline_core::type_aliases::*;

/// Common traits, re-exported from indexing and query
pub mod traits {
    #[doc(inline)]
    pub use ragline_core::indexing_traits::*;
    #[doc(inline)]
    pub use ragline_core::query_traits::*;
    #[doc(inline)]
    pub use ragline_core::vector_store::VectorStore;
}

/// `OpenAI`, Pinecone, BM25 and transport settings.
pub mod integrations {
    #[doc(inline)]
    pub use ragline_integrations::*;
}

/// Loading, chunking and indexing documents into a hybrid index.
pub mod indexing {
    #[doc(inline)]
    pub use ragline_core::indexing::*;
    #[doc(inline)]
    pub use ragline_indexing::*;
}

/// Query the hybrid index with a transforming pipeline
pub mod query {
    #[doc(inline)]
    pub use ragline_core::querying::*;
    #[doc(inline)]
    pub use ragline_query::*;
}

/// Image, audio and video description.
pub mod media {
    #[doc(inline)]
    pub use ragline_media::*;
}
