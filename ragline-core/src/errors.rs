//! Error taxonomy shared by the ragline crates.
use std::path::PathBuf;

use thiserror::Error;

pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Failure of a single call to a remote model (embedding, completion, vision).
#[derive(Error, Debug)]
pub enum LanguageModelError {
    #[error("Context length exceeded: {0}")]
    ContextLengthExceeded(BoxedError),
    #[error("Permanent error: {0}")]
    PermanentError(BoxedError),
    /// Network level failures, timeouts and 5xx/429 responses. Safe to retry.
    #[error("Transient error: {0}")]
    TransientError(BoxedError),
}

impl LanguageModelError {
    pub fn permanent(e: impl Into<BoxedError>) -> Self {
        LanguageModelError::PermanentError(e.into())
    }

    pub fn transient(e: impl Into<BoxedError>) -> Self {
        LanguageModelError::TransientError(e.into())
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, LanguageModelError::TransientError(_))
    }
}

impl From<anyhow::Error> for LanguageModelError {
    fn from(e: anyhow::Error) -> Self {
        LanguageModelError::PermanentError(e.into())
    }
}

impl From<tera::Error> for LanguageModelError {
    fn from(e: tera::Error) -> Self {
        LanguageModelError::PermanentError(e.into())
    }
}

/// Lifecycle failures of the persisted sparse encoder.
///
/// `MissingState` and `CorruptState` are fatal for a retrieval-only process: without a corpus
/// there is nothing to fit a replacement on.
#[derive(Error, Debug)]
pub enum SparseEncoderError {
    #[error("cannot fit a sparse encoder on an empty corpus")]
    EmptyCorpus,
    #[error(
        "no fitted sparse encoder state at {}; run the indexing pipeline first",
        .path.display()
    )]
    MissingState { path: PathBuf },
    #[error("sparse encoder state at {} is corrupt: {source}", .path.display())]
    CorruptState {
        path: PathBuf,
        #[source]
        source: BoxedError,
    },
}

/// Failures of the hybrid index lifecycle.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error(
        "index `{name}` already exists with dimension {actual}, but the embedding model produces \
         {expected}"
    )]
    DimensionMismatch {
        name: String,
        expected: u32,
        actual: u32,
    },
    #[error("alpha must be within [0, 1], got {0}")]
    InvalidAlpha(f32),
    #[error("expected {expected} embeddings from the embedding model, got {actual}")]
    EmbeddingCount { expected: usize, actual: usize },
    #[error(transparent)]
    Model(#[from] LanguageModelError),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}
