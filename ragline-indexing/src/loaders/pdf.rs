use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context as _, Result};
use lopdf::Document;
use ragline_core::{Chunk, Metadata};

use super::Loader;

/// Loads a PDF, one chunk per page.
///
/// # Metadata
///
/// - `page_number`: 1-based page number
/// - `total_pages`: number of pages in the document
/// - `source`: the file the page came from
#[derive(Debug, Clone)]
pub struct PdfLoader {
    path: PathBuf,
}

impl PdfLoader {
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Collapses the hard line wraps of extracted PDF text while keeping paragraph breaks.
fn normalize_whitespace(text: &str) -> String {
    text.split("\n\n")
        .map(|paragraph| paragraph.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|paragraph| !paragraph.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

impl Loader for PdfLoader {
    /// # Errors
    ///
    /// Errors if the PDF is encrypted, malformed or has no pages.
    #[tracing::instrument(skip(self), fields(path = %self.path.display()))]
    fn load(&self) -> Result<Vec<Chunk>> {
        let doc = match Document::load(&self.path) {
            Ok(doc) => doc,
            Err(e) if e.to_string().to_lowercase().contains("encrypted") => {
                return Err(anyhow!(
                    "PDF is encrypted and cannot be processed: {}",
                    self.path.display()
                ));
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to load PDF file: {}", self.path.display()));
            }
        };

        if doc.is_encrypted() {
            return Err(anyhow!(
                "PDF is encrypted and cannot be processed: {}",
                self.path.display()
            ));
        }

        // Keys are sorted
        let page_numbers = doc.get_pages().into_keys().collect::<Vec<_>>();
        let total_pages = page_numbers.len();
        if total_pages == 0 {
            return Err(anyhow!("PDF contains no pages: {}", self.path.display()));
        }

        let source = self.path.to_string_lossy().into_owned();
        let mut chunks = Vec::with_capacity(total_pages);

        for page_number in page_numbers {
            let text = doc.extract_text(&[page_number]).with_context(|| {
                format!(
                    "Failed to extract text from page {page_number} of PDF: {}",
                    self.path.display()
                )
            })?;
            let text = normalize_whitespace(&text);

            if text.is_empty() {
                tracing::debug!(page = page_number, "Skipping page without text");
                continue;
            }

            let metadata = Metadata::from([
                ("page_number", serde_json::Value::from(page_number)),
                ("total_pages", serde_json::Value::from(total_pages)),
                ("source", serde_json::Value::from(source.clone())),
            ]);

            chunks.push(
                Chunk::new(text)
                    .with_path(&self.path)
                    .with_metadata(metadata),
            );
        }

        tracing::debug!(pages = total_pages, chunks = chunks.len(), "Loaded PDF");
        Ok(chunks)
    }
}
