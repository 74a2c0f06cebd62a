use std::path::{Path, PathBuf};

use ragline_core::errors::SparseEncoderError;

use super::{Bm25Encoder, Bm25State};

/// Fit-or-load lifecycle of the BM25 encoder, persisted as JSON at a fixed path.
///
/// The indexing process fits on its corpus and persists; retrieval processes only ever load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparseEncoderStore {
    path: PathBuf,
}

/// Result of [`SparseEncoderStore::fit_and_persist`].
#[derive(Debug, Clone)]
pub struct FittedEncoder {
    pub encoder: Bm25Encoder,
    /// False when the state could not be written. The encoder is still usable in this
    /// process, but a later retrieval process will fail to load it.
    pub persisted: bool,
}

impl SparseEncoderStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fits a BM25 encoder on `corpus` and writes its state, creating parent directories.
    ///
    /// A failed write is logged and reflected in [`FittedEncoder::persisted`], it does not fail
    /// the fit.
    ///
    /// # Errors
    ///
    /// Returns [`SparseEncoderError::EmptyCorpus`] if `corpus` is empty. Nothing is written in
    /// that case.
    #[tracing::instrument(skip_all, fields(path = %self.path.display(), documents = corpus.len()), err)]
    pub async fn fit_and_persist<S: AsRef<str>>(
        &self,
        corpus: &[S],
    ) -> Result<FittedEncoder, SparseEncoderError> {
        let encoder = Bm25Encoder::fit(corpus)?;

        let persisted = match self.persist(encoder.state()).await {
            Ok(()) => {
                tracing::info!("Persisted sparse encoder state");
                true
            }
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    "Failed to persist sparse encoder state. The encoder is only available to \
                     this process; retrieval processes will not be able to load it"
                );
                false
            }
        };

        Ok(FittedEncoder { encoder, persisted })
    }

    async fn persist(&self, state: &Bm25State) -> anyhow::Result<()> {
        if let Some(parent) = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
        {
            fs_err::tokio::create_dir_all(parent).await?;
        }

        let json = serde_json::to_vec(state)?;
        fs_err::tokio::write(&self.path, json).await?;

        Ok(())
    }

    /// Loads a previously persisted encoder. Never fits.
    ///
    /// # Errors
    ///
    /// Returns [`SparseEncoderError::MissingState`] if nothing exists at the path and
    /// [`SparseEncoderError::CorruptState`] if the file cannot be read as a valid state.
    #[tracing::instrument(skip_all, fields(path = %self.path.display()), err)]
    pub async fn load_or_fail(&self) -> Result<Bm25Encoder, SparseEncoderError> {
        let bytes = match fs_err::tokio::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(SparseEncoderError::MissingState {
                    path: self.path.clone(),
                });
            }
            Err(err) => return Err(self.corrupt(err)),
        };

        let state: Bm25State = serde_json::from_slice(&bytes).map_err(|err| self.corrupt(err))?;
        let encoder = Bm25Encoder::from_state(state).map_err(|err| self.corrupt(err))?;

        tracing::debug!(n_docs = encoder.state().n_docs, "Loaded sparse encoder state");
        Ok(encoder)
    }

    fn corrupt(&self, err: impl Into<ragline_core::errors::BoxedError>) -> SparseEncoderError {
        SparseEncoderError::CorruptState {
            path: self.path.clone(),
            source: err.into(),
        }
    }
}
