//! Loaders turn a source file into chunks of text with provenance metadata.
//!
//! [`DocumentLoader`] picks the loader from the [`FileKind`] of the path. Media files are not
//! documents and are rejected just like unknown extensions.
use std::path::{Path, PathBuf};

use ragline_core::{Chunk, FileKind};
use thiserror::Error;

mod csv;
mod pdf;

pub use csv::CsvLoader;
pub use pdf::PdfLoader;

#[cfg(test)]
pub(crate) use pdf::tests::write_pdf;

/// Loads a file into chunks.
pub trait Loader {
    /// # Errors
    ///
    /// Errors if the file cannot be read or parsed.
    fn load(&self) -> anyhow::Result<Vec<Chunk>>;
}

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("unsupported document type `{extension}`, only .pdf and .csv can be indexed")]
    Unsupported { extension: String },
    #[error("document not found: {}", .path.display())]
    NotFound { path: PathBuf },
    #[error("failed to load {}: {source:#}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

/// A document loaded from disk.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub kind: FileKind,
    /// Pages for a PDF, rows for a CSV
    pub chunks: Vec<Chunk>,
}

/// Dispatches to [`PdfLoader`] or [`CsvLoader`] by file kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentLoader;

impl DocumentLoader {
    /// # Errors
    ///
    /// - [`DocumentError::Unsupported`] for anything but PDF and CSV files
    /// - [`DocumentError::NotFound`] if the file does not exist
    /// - [`DocumentError::Load`] if the file cannot be parsed
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()), err)]
    pub fn load(path: impl AsRef<Path>) -> Result<LoadedDocument, DocumentError> {
        let path = path.as_ref();
        let kind = FileKind::from_path(path);

        let extension = match &kind {
            FileKind::Pdf | FileKind::Csv => None,
            FileKind::Unsupported(extension) => Some(extension.clone()),
            media => Some(
                path.extension()
                    .map_or_else(|| media.to_string(), |ext| ext.to_string_lossy().to_lowercase()),
            ),
        };
        if let Some(extension) = extension {
            return Err(DocumentError::Unsupported { extension });
        }

        if !path.is_file() {
            return Err(DocumentError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let chunks = match kind {
            FileKind::Pdf => PdfLoader::from_path(path).load(),
            _ => CsvLoader::from_path(path).load(),
        }
        .map_err(|source| DocumentError::Load {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::info!(%kind, chunks = chunks.len(), "Loaded document");
        Ok(LoadedDocument { kind, chunks })
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("notes.txt", "txt"; "text")]
    #[test_case("clip.mp4", "mp4"; "video")]
    #[test_case("photo.PNG", "png"; "image")]
    #[test_case("README", ""; "no extension")]
    fn test_rejects_unsupported(path: &str, expected: &str) {
        let err = DocumentLoader::load(path).unwrap_err();
        assert!(
            matches!(&err, DocumentError::Unsupported { extension } if extension == expected),
            "{err}"
        );
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            DocumentLoader::load("does/not/exist.csv"),
            Err(DocumentError::NotFound { .. })
        ));
    }
}
