//! The remote vector collection as seen by the hybrid index.
//!
//! A [`VectorStore`] is an opaque service holding named indexes of records that carry a dense
//! vector, an optional sparse vector and the chunk they were computed from.
use async_trait::async_trait;
use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::{chunk::Chunk, Embedding, SparseEmbedding};

#[cfg(feature = "test-utils")]
#[doc(hidden)]
use mockall::automock;

/// Distance metric declared when an index is created.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Metric {
    /// Required for hybrid queries on most managed stores.
    #[default]
    Dotproduct,
    Cosine,
    Euclidean,
}

/// What an index must look like.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub name: String,
    pub dimension: u32,
    pub metric: Metric,
}

impl IndexSpec {
    pub fn new(name: impl Into<String>, dimension: u32, metric: Metric) -> Self {
        Self {
            name: name.into(),
            dimension,
            metric,
        }
    }
}

/// Handle to an existing remote index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexHandle {
    pub name: String,
    pub dimension: u32,
    pub metric: Metric,
    /// Data plane host, for stores that serve each index on its own host.
    pub host: Option<String>,
}

/// A single record to upsert.
#[derive(Debug, Clone)]
pub struct VectorRecord {
    pub id: String,
    pub values: Embedding,
    pub sparse_values: Option<SparseEmbedding>,
    pub chunk: Chunk,
}

/// A combined similarity search. Vectors are expected to be pre-scaled by the caller.
#[derive(Debug, Clone, Default)]
pub struct VectorQuery {
    pub vector: Embedding,
    pub sparse_vector: Option<SparseEmbedding>,
    pub top_k: usize,
}

/// A retrieved record with its combined similarity score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub id: String,
    pub chunk: Chunk,
    pub score: f32,
}

impl ScoredChunk {
    pub fn text(&self) -> &str {
        &self.chunk.text
    }
}

/// A remote collection of vector indexes.
#[cfg_attr(feature = "test-utils", automock)]
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Names of all existing indexes.
    async fn list_indexes(&self) -> Result<Vec<String>>;

    /// Schema of an existing index.
    async fn describe_index(&self, name: &str) -> Result<IndexHandle>;

    /// Creates an index and returns once it is ready for upserts.
    async fn create_index(&self, spec: &IndexSpec) -> Result<IndexHandle>;

    /// Inserts or overwrites records by id.
    async fn upsert(&self, index: &IndexHandle, records: Vec<VectorRecord>) -> Result<()>;

    /// Returns at most `top_k` records ordered by descending score.
    async fn query(&self, index: &IndexHandle, query: VectorQuery) -> Result<Vec<ScoredChunk>>;

    fn name(&self) -> &'static str {
        let name = std::any::type_name::<Self>();
        name.split("::").last().unwrap_or(name)
    }
}

#[async_trait]
impl<T: VectorStore + ?Sized> VectorStore for std::sync::Arc<T> {
    async fn list_indexes(&self) -> Result<Vec<String>> {
        self.as_ref().list_indexes().await
    }

    async fn describe_index(&self, name: &str) -> Result<IndexHandle> {
        self.as_ref().describe_index(name).await
    }

    async fn create_index(&self, spec: &IndexSpec) -> Result<IndexHandle> {
        self.as_ref().create_index(spec).await
    }

    async fn upsert(&self, index: &IndexHandle, records: Vec<VectorRecord>) -> Result<()> {
        self.as_ref().upsert(index, records).await
    }

    async fn query(&self, index: &IndexHandle, query: VectorQuery) -> Result<Vec<ScoredChunk>> {
        self.as_ref().query(index, query).await
    }

    fn name(&self) -> &'static str {
        self.as_ref().name()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr as _;

    use super::*;

    #[test]
    fn test_metric_parsing() {
        assert_eq!(Metric::from_str("DotProduct").unwrap(), Metric::Dotproduct);
        assert_eq!(Metric::from_str("cosine").unwrap(), Metric::Cosine);
        assert!(Metric::from_str("manhattan").is_err());
        assert_eq!(Metric::Euclidean.to_string(), "euclidean");
    }

    #[test]
    fn test_metric_serde() {
        assert_eq!(
            serde_json::to_value(Metric::Dotproduct).unwrap(),
            serde_json::json!("dotproduct")
        );
    }
}
