//! Query pipeline for ragline: transform a question, retrieve from a hybrid index, answer it
//! with an llm and evaluate the result.
pub mod answers;
pub mod evaluators;
mod pipeline;
pub mod query_transformers;
pub mod retrievers;

pub use pipeline::Pipeline;
pub use retrievers::HybridRetriever;
