//! This module defines the `Chunk` struct, the atomic unit of indexing and retrieval.
//!
//! A `Chunk` is a piece of source text together with the provenance metadata describing where
//! it came from (source file, page, row). Chunks are produced by loaders and chunkers and are
//! not mutated afterwards; ordering among chunks of the same source only matters for provenance.
use std::{
    fmt::Debug,
    hash::{Hash, Hasher},
    path::PathBuf,
};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::{metadata::Metadata, util::debug_long_utf8};

/// A unit of source text plus its provenance metadata.
#[derive(Default, Clone, Serialize, Deserialize, PartialEq, Builder)]
#[builder(setter(into), build_fn(error = "anyhow::Error"))]
pub struct Chunk {
    /// File the chunk was derived from, if any.
    #[builder(default)]
    pub path: PathBuf,
    /// The text of the chunk.
    pub text: String,
    /// Provenance metadata.
    #[builder(default)]
    pub metadata: Metadata,
}

impl Debug for Chunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chunk")
            .field("id", &self.id())
            .field("path", &self.path)
            .field("text", &debug_long_utf8(&self.text, 100))
            .field("metadata", &self.metadata)
            .finish()
    }
}

impl Chunk {
    /// Creates a new instance of `ChunkBuilder`.
    pub fn builder() -> ChunkBuilder {
        ChunkBuilder::default()
    }

    /// Creates a chunk from text only; path and metadata are left empty.
    pub fn new(text: impl Into<String>) -> Chunk {
        Chunk {
            text: text.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: impl Into<Metadata>) -> Self {
        self.metadata = metadata.into();
        self
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    /// Stable identifier of the chunk.
    ///
    /// A UUID (v3) over the path and the text, so re-indexing the same content overwrites the
    /// same record instead of duplicating it. The path is length prefixed so that no other
    /// split of the same bytes into path and text gives the same id.
    ///
    /// WARN: Does not memoize the id. Use sparingly.
    pub fn id(&self) -> uuid::Uuid {
        let path = self.path.to_string_lossy();
        let bytes = [
            (path.len() as u64).to_le_bytes().as_slice(),
            path.as_bytes(),
            self.text.as_bytes(),
        ]
        .concat();

        uuid::Uuid::new_v3(&uuid::Uuid::NAMESPACE_OID, &bytes)
    }
}

impl Hash for Chunk {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
        self.text.hash(state);
    }
}

impl<T: AsRef<str>> From<T> for Chunk {
    fn from(value: T) -> Self {
        Chunk::new(value.as_ref())
    }
}
