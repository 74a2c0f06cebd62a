//! An in-memory [`VectorStore`].
//!
//! Great for experimentation and testing. Scores are the dense similarity under the index
//! metric plus the sparse dot product, which mirrors how managed stores combine pre-scaled
//! hybrid queries.
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use anyhow::{bail, Context as _, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;

use ragline_core::{
    util::{cosine_similarity, dot, euclidean_distance},
    vector_store::{
        IndexHandle, IndexSpec, Metric, ScoredChunk, VectorQuery, VectorRecord, VectorStore,
    },
};

#[derive(Debug, Default)]
struct MemoryIndex {
    handle: Option<IndexHandle>,
    /// Insertion ordered; an upsert of an existing id keeps its position.
    records: Vec<VectorRecord>,
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    indexes: Arc<RwLock<HashMap<String, MemoryIndex>>>,
    create_calls: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of indexes created through [`VectorStore::create_index`].
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::Relaxed)
    }

    /// Number of records stored in `index`.
    pub async fn len(&self, index: &str) -> usize {
        self.indexes
            .read()
            .await
            .get(index)
            .map_or(0, |index| index.records.len())
    }

    pub async fn is_empty(&self, index: &str) -> bool {
        self.len(index).await == 0
    }
}

fn dense_score(metric: Metric, query: &[f32], values: &[f32]) -> f32 {
    // A zero vector (alpha = 0) carries no dense signal under any metric
    if query.iter().all(|v| *v == 0.0) {
        return 0.0;
    }

    match metric {
        Metric::Dotproduct => dot(query, values),
        Metric::Cosine => cosine_similarity(query, values),
        Metric::Euclidean => -euclidean_distance(query, values),
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn list_indexes(&self) -> Result<Vec<String>> {
        let mut names = self.indexes.read().await.keys().cloned().collect::<Vec<_>>();
        names.sort();
        Ok(names)
    }

    async fn describe_index(&self, name: &str) -> Result<IndexHandle> {
        self.indexes
            .read()
            .await
            .get(name)
            .and_then(|index| index.handle.clone())
            .with_context(|| format!("Index {name} not found"))
    }

    async fn create_index(&self, spec: &IndexSpec) -> Result<IndexHandle> {
        let mut indexes = self.indexes.write().await;
        if indexes.contains_key(&spec.name) {
            bail!("Index {} already exists", spec.name);
        }

        let handle = IndexHandle {
            name: spec.name.clone(),
            dimension: spec.dimension,
            metric: spec.metric,
            host: None,
        };

        indexes.insert(
            spec.name.clone(),
            MemoryIndex {
                handle: Some(handle.clone()),
                records: Vec::new(),
            },
        );
        self.create_calls.fetch_add(1, Ordering::Relaxed);

        Ok(handle)
    }

    async fn upsert(&self, index: &IndexHandle, records: Vec<VectorRecord>) -> Result<()> {
        let mut indexes = self.indexes.write().await;
        let memory_index = indexes
            .get_mut(&index.name)
            .with_context(|| format!("Index {} not found", index.name))?;

        for record in records {
            if record.values.len() != index.dimension as usize {
                bail!(
                    "Vector dimension {} does not match the dimension of index {} ({})",
                    record.values.len(),
                    index.name,
                    index.dimension
                );
            }

            if let Some(existing) = memory_index
                .records
                .iter_mut()
                .find(|existing| existing.id == record.id)
            {
                *existing = record;
            } else {
                memory_index.records.push(record);
            }
        }

        Ok(())
    }

    async fn query(&self, index: &IndexHandle, query: VectorQuery) -> Result<Vec<ScoredChunk>> {
        if query.vector.len() != index.dimension as usize {
            bail!(
                "Query dimension {} does not match the dimension of index {} ({})",
                query.vector.len(),
                index.name,
                index.dimension
            );
        }

        let indexes = self.indexes.read().await;
        let memory_index = indexes
            .get(&index.name)
            .with_context(|| format!("Index {} not found", index.name))?;

        let mut results = memory_index
            .records
            .iter()
            .map(|record| {
                let dense = dense_score(index.metric, &query.vector, &record.values);
                let sparse = match (&query.sparse_vector, &record.sparse_values) {
                    (Some(query), Some(values)) => query.dot(values),
                    _ => 0.0,
                };

                ScoredChunk {
                    id: record.id.clone(),
                    chunk: record.chunk.clone(),
                    score: dense + sparse,
                }
            })
            .collect::<Vec<_>>();

        // Stable, so ties keep insertion order
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(query.top_k);

        Ok(results)
    }

    fn name(&self) -> &'static str {
        "MemoryStore"
    }
}

#[cfg(test)]
mod tests {
    use ragline_core::{Chunk, SparseEmbedding};

    use super::*;

    fn record(text: &str, values: Vec<f32>, sparse: Option<SparseEmbedding>) -> VectorRecord {
        let chunk = Chunk::new(text);
        VectorRecord {
            id: chunk.id().to_string(),
            values,
            sparse_values: sparse,
            chunk,
        }
    }

    async fn index(store: &MemoryStore) -> IndexHandle {
        store
            .create_index(&IndexSpec::new("test", 2, Metric::Dotproduct))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_upsert_overwrites_by_id() {
        let store = MemoryStore::new();
        let handle = index(&store).await;

        store
            .upsert(&handle, vec![record("a", vec![1.0, 0.0], None)])
            .await
            .unwrap();
        store
            .upsert(&handle, vec![record("a", vec![0.0, 1.0], None)])
            .await
            .unwrap();

        assert_eq!(store.len("test").await, 1);
    }

    #[tokio::test]
    async fn test_ties_keep_insertion_order() {
        let store = MemoryStore::new();
        let handle = index(&store).await;

        store
            .upsert(
                &handle,
                vec![
                    record("first", vec![1.0, 0.0], None),
                    record("second", vec![1.0, 0.0], None),
                    record("third", vec![1.0, 0.0], None),
                ],
            )
            .await
            .unwrap();

        let results = store
            .query(
                &handle,
                VectorQuery {
                    vector: vec![1.0, 0.0],
                    sparse_vector: None,
                    top_k: 2,
                },
            )
            .await
            .unwrap();

        let texts = results.iter().map(ScoredChunk::text).collect::<Vec<_>>();
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_sparse_scores_are_added() {
        let store = MemoryStore::new();
        let handle = index(&store).await;

        let sparse = SparseEmbedding {
            indices: vec![7],
            values: vec![1.0],
        };
        store
            .upsert(
                &handle,
                vec![
                    record("dense only", vec![1.0, 0.0], None),
                    record("lexical", vec![1.0, 0.0], Some(sparse.clone())),
                ],
            )
            .await
            .unwrap();

        let results = store
            .query(
                &handle,
                VectorQuery {
                    vector: vec![0.5, 0.0],
                    sparse_vector: Some(sparse.scaled(0.5)),
                    top_k: 2,
                },
            )
            .await
            .unwrap();

        assert_eq!(results[0].text(), "lexical");
        assert!((results[0].score - 1.0).abs() < 1e-6);
        assert!((results[1].score - 0.5).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_rejects_wrong_dimension() {
        let store = MemoryStore::new();
        let handle = index(&store).await;

        let result = store
            .upsert(&handle, vec![record("a", vec![1.0, 0.0, 0.0], None)])
            .await;
        assert!(result.is_err());
    }
}
