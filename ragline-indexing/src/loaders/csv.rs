use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use ragline_core::{Chunk, Metadata};

use super::Loader;

/// Loads a CSV file with a header row. Every row becomes one chunk, rendered as one
/// `column: value` line per column.
///
/// Each chunk carries `source` (the file) and `row` (zero based, excluding the header).
#[derive(Debug, Clone)]
pub struct CsvLoader {
    path: PathBuf,
    delimiter: u8,
}

impl CsvLoader {
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            delimiter: b',',
        }
    }

    #[must_use]
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Loader for CsvLoader {
    #[tracing::instrument(skip(self), fields(path = %self.path.display()))]
    fn load(&self) -> Result<Vec<Chunk>> {
        let mut reader = ::csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .from_path(&self.path)
            .with_context(|| format!("Failed to open CSV file: {}", self.path.display()))?;

        let headers = reader
            .headers()
            .context("Failed to read CSV header")?
            .iter()
            .map(|header| header.trim().to_string())
            .collect::<Vec<_>>();

        let source = self.path.to_string_lossy().into_owned();

        reader
            .records()
            .enumerate()
            .map(|(row, record)| {
                let record = record.with_context(|| format!("Failed to read CSV row {row}"))?;

                let text = headers
                    .iter()
                    .zip(record.iter())
                    .map(|(header, value)| format!("{header}: {}", value.trim()))
                    .collect::<Vec<_>>()
                    .join("\n");

                let metadata = Metadata::from([
                    ("source", serde_json::Value::from(source.clone())),
                    ("row", serde_json::Value::from(row)),
                ]);

                Ok(Chunk::new(text)
                    .with_path(&self.path)
                    .with_metadata(metadata))
            })
            .collect()
    }
}
