//! Pinecone serverless indexes over the REST API.
//!
//! The control plane (`api_base`) lists, describes and creates indexes; records are upserted
//! to and queried from the data plane host of each index. The chunk text is stored in the
//! record metadata under `text_key` (`context` by default), next to the chunk's own metadata.
//!
//! Hybrid queries require a `dotproduct` index.
use std::{ops::Range, path::PathBuf, time::Duration};

use anyhow::{bail, Context as _, Result};
use async_trait::async_trait;
use derive_builder::Builder;
use ragline_core::{
    vector_store::{IndexHandle, IndexSpec, ScoredChunk, VectorQuery, VectorRecord, VectorStore},
    Chunk,
};
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret as _, SecretString};
use serde::de::DeserializeOwned;

mod models;

use models::{
    CreateIndexRequest, IndexModel, IndexSpecModel, ListIndexesResponse, QueryRequest,
    QueryResponse, ServerlessSpec, UpsertRequest, Vector,
};

pub const DEFAULT_API_BASE: &str = "https://api.pinecone.io";
pub const DEFAULT_TEXT_KEY: &str = "context";
const API_VERSION: &str = "2024-07";
const PATH_KEY: &str = "file_path";
/// Pinecone rejects upsert requests above 2MB, this leaves room for the envelope.
pub const MAX_UPSERT_BYTES: usize = 2_000_000;

#[derive(Debug, Builder)]
#[builder(
    pattern = "owned",
    setter(into, strip_option),
    build_fn(error = "anyhow::Error")
)]
pub struct Pinecone {
    api_key: SecretString,
    /// Http client, usually from [`crate::transport::TransportConfig::http_client`]
    #[builder(default)]
    http_client: reqwest::Client,
    #[builder(default = "DEFAULT_API_BASE.to_string()")]
    api_base: String,
    #[builder(default)]
    namespace: Option<String>,
    #[builder(default = "\"aws\".to_string()")]
    cloud: String,
    #[builder(default = "\"us-east-1\".to_string()")]
    region: String,
    /// Metadata key holding the chunk text
    #[builder(default = "DEFAULT_TEXT_KEY.to_string()")]
    text_key: String,
    /// Delay between readiness checks after creating an index
    #[builder(default = "Duration::from_secs(1)")]
    ready_poll_interval: Duration,
    #[builder(default = "60")]
    ready_poll_attempts: u32,
}

impl Pinecone {
    pub fn builder() -> PineconeBuilder {
        PineconeBuilder::default()
    }

    fn control_plane(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{path}", self.api_base.trim_end_matches('/'));
        self.authorized(self.http_client.request(method, url))
    }

    fn data_plane(&self, index: &IndexHandle, path: &str) -> Result<RequestBuilder> {
        let host = index
            .host
            .as_deref()
            .filter(|host| !host.is_empty())
            .with_context(|| format!("Index {} has no data plane host", index.name))?;

        let base = if host.starts_with("http://") || host.starts_with("https://") {
            host.trim_end_matches('/').to_string()
        } else {
            format!("https://{host}")
        };

        Ok(self.authorized(self.http_client.post(format!("{base}{path}"))))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("Api-Key", self.api_key.expose_secret())
            .header("X-Pinecone-API-Version", API_VERSION)
    }

    async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T> {
        let response = request.send().await.context("Request to Pinecone failed")?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Pinecone responded with {status}: {body}");
        }

        response
            .json::<T>()
            .await
            .context("Failed to parse Pinecone response")
    }

    async fn describe(&self, name: &str) -> Result<IndexModel> {
        Self::send(self.control_plane(Method::GET, &format!("/indexes/{name}"))).await
    }

    async fn wait_until_ready(&self, name: &str) -> Result<IndexModel> {
        for attempt in 1..=self.ready_poll_attempts.max(1) {
            let model = self.describe(name).await?;
            if model.status.ready {
                return Ok(model);
            }

            tracing::debug!(
                attempt,
                state = model.status.state,
                "Waiting for index to become ready"
            );
            tokio::time::sleep(self.ready_poll_interval).await;
        }

        bail!("Index {name} did not become ready in time")
    }

    fn to_metadata(&self, chunk: &Chunk) -> serde_json::Map<String, serde_json::Value> {
        let mut metadata: serde_json::Map<String, serde_json::Value> =
            chunk.metadata.clone().into();

        metadata.insert(self.text_key.clone(), chunk.text.clone().into());
        if !chunk.path.as_os_str().is_empty() {
            metadata.insert(
                PATH_KEY.to_string(),
                chunk.path.to_string_lossy().into_owned().into(),
            );
        }

        metadata
    }

    fn to_chunk(&self, metadata: Option<serde_json::Map<String, serde_json::Value>>) -> Chunk {
        let mut metadata = metadata.unwrap_or_default();

        let text = metadata
            .remove(&self.text_key)
            .and_then(|value| value.as_str().map(ToString::to_string))
            .unwrap_or_default();
        let path = metadata
            .remove(PATH_KEY)
            .and_then(|value| value.as_str().map(PathBuf::from))
            .unwrap_or_default();

        Chunk::new(text)
            .with_path(path)
            .with_metadata(metadata)
    }
}

/// Splits vectors into consecutive ranges whose serialized size stays under `max_bytes`.
///
/// A vector that is larger on its own still gets a range of its own.
fn split_by_size(vectors: &[Vector], max_bytes: usize) -> Result<Vec<Range<usize>>> {
    let mut ranges = Vec::new();
    let mut start = 0;
    let mut size = 0;

    for (i, vector) in vectors.iter().enumerate() {
        // +1 for the separating comma
        let len = serde_json::to_vec(vector)
            .context("Failed to serialize vector")?
            .len()
            + 1;

        if i > start && size + len > max_bytes {
            ranges.push(start..i);
            start = i;
            size = 0;
        }
        size += len;
    }

    if start < vectors.len() {
        ranges.push(start..vectors.len());
    }

    Ok(ranges)
}

fn to_handle(model: IndexModel) -> IndexHandle {
    IndexHandle {
        name: model.name,
        dimension: model.dimension,
        metric: model.metric,
        host: Some(model.host).filter(|host| !host.is_empty()),
    }
}

#[async_trait]
impl VectorStore for Pinecone {
    #[tracing::instrument(skip_all, err)]
    async fn list_indexes(&self) -> Result<Vec<String>> {
        let response: ListIndexesResponse =
            Self::send(self.control_plane(Method::GET, "/indexes")).await?;

        Ok(response.indexes.into_iter().map(|index| index.name).collect())
    }

    #[tracing::instrument(skip(self), err)]
    async fn describe_index(&self, name: &str) -> Result<IndexHandle> {
        self.describe(name).await.map(to_handle)
    }

    #[tracing::instrument(skip_all, fields(index = %spec.name), err)]
    async fn create_index(&self, spec: &IndexSpec) -> Result<IndexHandle> {
        let request = CreateIndexRequest {
            name: &spec.name,
            dimension: spec.dimension,
            metric: spec.metric,
            spec: IndexSpecModel {
                serverless: ServerlessSpec {
                    cloud: &self.cloud,
                    region: &self.region,
                },
            },
        };

        let response = self
            .control_plane(Method::POST, "/indexes")
            .json(&request)
            .send()
            .await
            .context("Request to Pinecone failed")?;

        match response.status() {
            status if status.is_success() => {
                tracing::info!(cloud = %self.cloud, region = %self.region, "Created index");
            }
            // Created concurrently by another process
            StatusCode::CONFLICT => tracing::warn!("Index already exists"),
            status => {
                let body = response.text().await.unwrap_or_default();
                bail!("Failed to create index {}: {status}: {body}", spec.name);
            }
        }

        self.wait_until_ready(&spec.name).await.map(to_handle)
    }

    #[tracing::instrument(skip_all, fields(index = %index.name, records = records.len()), err)]
    async fn upsert(&self, index: &IndexHandle, records: Vec<VectorRecord>) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let vectors = records
            .into_iter()
            .map(|record| Vector {
                metadata: self.to_metadata(&record.chunk),
                id: record.id,
                values: record.values,
                sparse_values: record.sparse_values.map(Into::into),
            })
            .collect::<Vec<_>>();

        for range in split_by_size(&vectors, MAX_UPSERT_BYTES)? {
            let request = UpsertRequest {
                vectors: &vectors[range],
                namespace: self.namespace.as_deref(),
            };

            let _: serde_json::Value =
                Self::send(self.data_plane(index, "/vectors/upsert")?.json(&request)).await?;
        }

        Ok(())
    }

    #[tracing::instrument(skip_all, fields(index = %index.name, top_k = query.top_k), err)]
    async fn query(&self, index: &IndexHandle, query: VectorQuery) -> Result<Vec<ScoredChunk>> {
        let request = QueryRequest {
            vector: query.vector,
            sparse_vector: query.sparse_vector.map(Into::into),
            top_k: query.top_k,
            include_metadata: true,
            include_values: false,
            namespace: self.namespace.as_deref(),
        };

        let response: QueryResponse =
            Self::send(self.data_plane(index, "/query")?.json(&request)).await?;

        tracing::debug!(matches = response.matches.len(), "Pinecone query");

        Ok(response
            .matches
            .into_iter()
            .map(|hit| ScoredChunk {
                chunk: self.to_chunk(hit.metadata),
                id: hit.id,
                score: hit.score,
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "Pinecone"
    }
}

#[cfg(test)]
mod tests {
    use ragline_core::Metadata;
    use serde_json::json;

    use super::*;

    fn pinecone() -> Pinecone {
        Pinecone::builder()
            .api_key(SecretString::from("test-key"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_metadata_round_trip() {
        let pinecone = pinecone();
        let chunk = Chunk::new("the cat sat")
            .with_path("docs/cats.pdf")
            .with_metadata([("page_number", json!(1))]);

        let metadata = pinecone.to_metadata(&chunk);
        assert_eq!(metadata["context"], json!("the cat sat"));
        assert_eq!(metadata["page_number"], json!(1));

        let back = pinecone.to_chunk(Some(metadata));
        assert_eq!(back, chunk);
        assert_eq!(back.metadata, Metadata::from([("page_number", json!(1))]));
    }

    #[test]
    fn test_missing_metadata_gives_empty_chunk() {
        let chunk = pinecone().to_chunk(None);
        assert!(chunk.text.is_empty());
    }

    #[test]
    fn test_split_by_size_keeps_each_range_under_the_limit() {
        let vectors = (0..10)
            .map(|i| Vector {
                id: i.to_string(),
                values: vec![0.123_456_7; 100],
                sparse_values: None,
                metadata: serde_json::Map::new(),
            })
            .collect::<Vec<_>>();
        let one = serde_json::to_vec(&vectors[0]).unwrap().len() + 1;

        let ranges = split_by_size(&vectors, one * 3).unwrap();

        assert_eq!(ranges, vec![0..3, 3..6, 6..9, 9..10]);
    }

    #[test]
    fn test_oversized_vector_gets_its_own_range() {
        let vectors = vec![
            Vector {
                id: "big".into(),
                values: vec![0.5; 1000],
                sparse_values: None,
                metadata: serde_json::Map::new(),
            },
            Vector {
                id: "small".into(),
                values: vec![0.5],
                sparse_values: None,
                metadata: serde_json::Map::new(),
            },
        ];

        let ranges = split_by_size(&vectors, 100).unwrap();

        assert_eq!(ranges, vec![0..1, 1..2]);
    }
}
