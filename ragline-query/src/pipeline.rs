//! A query pipeline runs a question through transformers, a retriever and an answer generator.
//!
//! ```no_run
//! # use ragline_core::{querying::search_strategies::HybridSearch, EmbeddingModel, SimplePrompt, SparseEncoder};
//! # use ragline_query::{answers, query_transformers, HybridRetriever, Pipeline};
//! # use std::sync::Arc;
//! # async fn run(
//! #     embed: Arc<dyn EmbeddingModel>,
//! #     sparse: Arc<dyn SparseEncoder>,
//! #     retriever: HybridRetriever,
//! #     llm: Arc<dyn SimplePrompt>,
//! # ) -> anyhow::Result<()> {
//! let pipeline = Pipeline::from_search_strategy(HybridSearch::new(0.5, 3)?)
//!     .then_transform_query(query_transformers::Embed::new(embed))
//!     .then_transform_query(query_transformers::SparseEmbed::new(sparse))
//!     .then_retrieve(retriever)
//!     .then_answer(answers::Simple::new(llm));
//!
//! let answered = pipeline.query("What is hybrid search?").await?;
//! println!("{}", answered.answer());
//! # Ok(())
//! # }
//! ```
use futures_util::{StreamExt as _, TryStreamExt as _};
use ragline_core::{
    prelude::*,
    querying::{
        search_strategies::HybridSearch, states, Answer, EvaluateQuery, Query, QueryEvaluation,
        Retrieve, SearchStrategy, TransformQuery,
    },
};

pub struct Pipeline<S: SearchStrategy = HybridSearch> {
    search_strategy: S,
    query_transformers: Vec<Box<dyn TransformQuery>>,
    retriever: Option<Box<dyn Retrieve<S>>>,
    answer: Option<Box<dyn Answer>>,
    evaluator: Option<Box<dyn EvaluateQuery>>,
}

impl Default for Pipeline<HybridSearch> {
    fn default() -> Self {
        Pipeline::from_search_strategy(HybridSearch::default())
    }
}

impl<S: SearchStrategy> std::fmt::Debug for Pipeline<S>
where
    S: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("search_strategy", &self.search_strategy)
            .field("query_transformers", &self.query_transformers.len())
            .field("retriever", &self.retriever.is_some())
            .field("answer", &self.answer.is_some())
            .field("evaluator", &self.evaluator.is_some())
            .finish()
    }
}

impl<S: SearchStrategy + 'static> Pipeline<S> {
    pub fn from_search_strategy(search_strategy: S) -> Pipeline<S> {
        Pipeline {
            search_strategy,
            query_transformers: Vec::new(),
            retriever: None,
            answer: None,
            evaluator: None,
        }
    }

    pub fn search_strategy(&self) -> &S {
        &self.search_strategy
    }

    /// Evaluates every query after retrieval and after answering.
    #[must_use]
    pub fn evaluate_with(mut self, evaluator: impl EvaluateQuery + 'static) -> Self {
        self.evaluator = Some(Box::new(evaluator));
        self
    }

    /// Transformers run in the order they are added.
    #[must_use]
    pub fn then_transform_query(mut self, transformer: impl TransformQuery + 'static) -> Self {
        self.query_transformers.push(Box::new(transformer));
        self
    }

    #[must_use]
    pub fn then_retrieve(mut self, retriever: impl Retrieve<S> + 'static) -> Self {
        self.retriever = Some(Box::new(retriever));
        self
    }

    #[must_use]
    pub fn then_answer(mut self, answer: impl Answer + 'static) -> Self {
        self.answer = Some(Box::new(answer));
        self
    }

    /// Transforms the query and retrieves documents, without answering.
    ///
    /// # Errors
    ///
    /// Errors if the pipeline has no retriever or if any step fails.
    pub async fn retrieve(
        &self,
        query: impl Into<Query<states::Pending>>,
    ) -> Result<Query<states::Retrieved>> {
        let Some(retriever) = &self.retriever else {
            anyhow::bail!("Pipeline has no retriever")
        };

        let mut query = query.into();
        for transformer in &self.query_transformers {
            query = transformer
                .transform_query(query)
                .instrument(tracing::trace_span!("then_transform_query"))
                .await?;
        }

        let retrieved = retriever
            .retrieve(&self.search_strategy, query)
            .instrument(tracing::trace_span!("then_retrieve"))
            .await?;

        self.evaluate(retrieved.clone().into()).await?;

        Ok(retrieved)
    }

    /// Runs the full pipeline.
    ///
    /// # Errors
    ///
    /// Errors if the pipeline has no retriever or no answer generator, or if any step (including
    /// the evaluator) fails.
    #[tracing::instrument(skip_all, name = "query_pipeline.query")]
    pub async fn query(
        &self,
        query: impl Into<Query<states::Pending>>,
    ) -> Result<Query<states::Answered>> {
        let Some(answer) = &self.answer else {
            anyhow::bail!("Pipeline has no answer generator")
        };

        let query = query.into();
        tracing::info!(query = %query.original(), "Querying");

        let retrieved = self.retrieve(query).await?;
        let answered = answer
            .answer(retrieved)
            .instrument(tracing::trace_span!("then_answer"))
            .await?;

        self.evaluate(answered.clone().into()).await?;

        tracing::debug!(
            documents = answered.documents().len(),
            "Answered query"
        );
        Ok(answered)
    }

    /// Runs every query one after the other, in order.
    ///
    /// # Errors
    ///
    /// Stops at the first query that fails.
    pub async fn query_all<Q>(
        &self,
        queries: impl IntoIterator<Item = Q>,
    ) -> Result<Vec<Query<states::Answered>>>
    where
        Q: Into<Query<states::Pending>>,
    {
        futures_util::stream::iter(queries)
            .then(|query| self.query(query))
            .try_collect()
            .await
    }

    async fn evaluate(&self, evaluation: QueryEvaluation) -> Result<()> {
        let Some(evaluator) = &self.evaluator else {
            return Ok(());
        };

        evaluator
            .evaluate(evaluation)
            .await
            .context("Failed to evaluate query")
    }
}

#[cfg(test)]
mod tests {
    use mockall::Sequence;
    use ragline_core::{vector_store::ScoredChunk, Chunk, MockEvaluateQuery};

    use super::*;

    fn retrieve_fixed(
        _strategy: &HybridSearch,
        query: Query<states::Pending>,
    ) -> Result<Query<states::Retrieved>> {
        let chunk = Chunk::new(format!("context for {}", query.current()));
        Ok(query.retrieved_documents(vec![ScoredChunk {
            id: chunk.id().to_string(),
            chunk,
            score: 1.0,
        }]))
    }

    fn answer_with_contexts(query: Query<states::Retrieved>) -> Result<Query<states::Answered>> {
        let answer = query.contexts().join(",");
        Ok(query.answered(answer))
    }

    fn lowercase(mut query: Query<states::Pending>) -> Result<Query<states::Pending>> {
        let lowered = query.current().to_lowercase();
        query.transformed_query(lowered);
        Ok(query)
    }

    #[tokio::test]
    async fn test_runs_steps_in_order() {
        let pipeline = Pipeline::default()
            .then_transform_query(lowercase)
            .then_retrieve(retrieve_fixed)
            .then_answer(answer_with_contexts);

        let answered = pipeline.query("What SAT").await.unwrap();

        assert_eq!(answered.original(), "What SAT");
        assert_eq!(answered.answer(), "context for what sat");
        assert_eq!(answered.query_transformations().len(), 1);
    }

    #[tokio::test]
    async fn test_reports_retrieval_then_answer_to_evaluator() {
        let mut evaluator = MockEvaluateQuery::new();
        let mut seq = Sequence::new();
        evaluator
            .expect_evaluate()
            .withf(|evaluation| matches!(evaluation, QueryEvaluation::RetrieveDocuments(_)))
            .once()
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        evaluator
            .expect_evaluate()
            .withf(|evaluation| matches!(evaluation, QueryEvaluation::AnswerQuery(_)))
            .once()
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        Pipeline::default()
            .then_retrieve(retrieve_fixed)
            .then_answer(answer_with_contexts)
            .evaluate_with(evaluator)
            .query("cat")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_query_all_keeps_order() {
        let pipeline = Pipeline::default()
            .then_retrieve(retrieve_fixed)
            .then_answer(answer_with_contexts);

        let answers = pipeline.query_all(["a", "b", "c"]).await.unwrap();

        assert_eq!(
            answers.iter().map(|a| a.answer()).collect::<Vec<_>>(),
            vec!["context for a", "context for b", "context for c"]
        );
    }

    #[tokio::test]
    async fn test_missing_steps_are_errors() {
        let err = Pipeline::default().query("cat").await.unwrap_err();
        assert_eq!(err.to_string(), "Pipeline has no answer generator");

        let err = Pipeline::default()
            .then_answer(answer_with_contexts)
            .query("cat")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Pipeline has no retriever");
    }
}
