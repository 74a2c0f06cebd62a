//! A query moving through the query pipeline.
//!
//! The state parameter tracks how far the query got: [`states::Pending`] queries can be
//! transformed and embedded, [`states::Retrieved`] queries carry the retrieved chunks and
//! [`states::Answered`] queries carry the final answer.
use crate::{vector_store::ScoredChunk, Embedding, SparseEmbedding};

#[derive(Clone, Debug, Default)]
pub struct Query<State> {
    original: String,
    current: String,
    state: State,
    query_transformations: Vec<TransformationEvent>,

    pub embedding: Option<Embedding>,
    pub sparse_embedding: Option<SparseEmbedding>,
}

impl<T> Query<T> {
    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    pub fn query_transformations(&self) -> &[TransformationEvent] {
        &self.query_transformations
    }

    fn transition_to<S>(self, new_state: S) -> Query<S> {
        Query {
            state: new_state,
            original: self.original,
            current: self.current,
            query_transformations: self.query_transformations,
            embedding: self.embedding,
            sparse_embedding: self.sparse_embedding,
        }
    }
}

impl Query<states::Pending> {
    pub fn new(query: impl Into<String>) -> Self {
        let query = query.into();
        Self {
            original: query.clone(),
            current: query,
            ..Default::default()
        }
    }

    pub fn transformed_query(&mut self, new_query: impl Into<String>) {
        let new_query = new_query.into();

        self.query_transformations.push(TransformationEvent {
            before: self.current.clone(),
            after: new_query.clone(),
        });

        self.current = new_query;
    }

    pub fn retrieved_documents(self, documents: Vec<ScoredChunk>) -> Query<states::Retrieved> {
        self.transition_to(states::Retrieved { documents })
    }
}

impl Query<states::Retrieved> {
    pub fn documents(&self) -> &[ScoredChunk] {
        &self.state.documents
    }

    /// Texts of the retrieved chunks, in ranking order.
    pub fn contexts(&self) -> Vec<String> {
        self.state
            .documents
            .iter()
            .map(|doc| doc.chunk.text.clone())
            .collect()
    }

    pub fn answered(self, answer: impl Into<String>) -> Query<states::Answered> {
        let state = states::Answered {
            answer: answer.into(),
            documents: self.state.documents.clone(),
        };
        self.transition_to(state)
    }
}

impl Query<states::Answered> {
    pub fn answer(&self) -> &str {
        &self.state.answer
    }

    /// Chunks the answer was generated from.
    pub fn documents(&self) -> &[ScoredChunk] {
        &self.state.documents
    }
}

pub mod states {
    use crate::vector_store::ScoredChunk;

    #[derive(Debug, Default, Clone)]
    pub struct Pending;

    #[derive(Debug, Default, Clone)]
    pub struct Retrieved {
        pub(crate) documents: Vec<ScoredChunk>,
    }

    #[derive(Debug, Default, Clone)]
    pub struct Answered {
        pub(crate) answer: String,
        pub(crate) documents: Vec<ScoredChunk>,
    }
}

impl<T: AsRef<str>> From<T> for Query<states::Pending> {
    fn from(original: T) -> Self {
        Query::new(original.as_ref())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransformationEvent {
    pub before: String,
    pub after: String,
}
