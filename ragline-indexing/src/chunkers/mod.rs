//! Chunkers split loaded documents into retrieval sized pieces.
mod semantic;

pub use semantic::{
    split_sentences, SemanticChunker, SemanticChunkerBuilder, DEFAULT_BREAKPOINT_PERCENTILE,
    DEFAULT_BUFFER_SIZE,
};
