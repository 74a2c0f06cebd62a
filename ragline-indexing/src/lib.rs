//! Document ingestion for ragline: loading, chunking and indexing into a hybrid index.
pub mod chunkers;
pub mod loaders;
mod pipeline;

pub use pipeline::{IndexingReport, Pipeline, PipelineBuilder};
