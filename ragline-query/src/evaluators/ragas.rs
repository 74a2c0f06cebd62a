use std::{path::Path, sync::Arc};

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::RwLock;

use ragline_core::{
    querying::{states, Query, QueryEvaluation},
    EvaluateQuery,
};

/// Collects evaluation data for ragas while queries run through the pipeline.
///
/// Only prepared questions are tracked; evaluating any other question is an error.
#[derive(Debug, Clone)]
pub struct Ragas {
    dataset: Arc<RwLock<EvaluationDataSet>>,
}

/// A question to evaluate, optionally with the expected answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationCase {
    pub question: String,
    #[serde(default)]
    pub ground_truth: String,
}

impl EvaluationCase {
    pub fn new(question: impl Into<String>, ground_truth: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ground_truth: ground_truth.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationData {
    pub question: String,
    pub answer: String,
    pub contexts: Vec<String>,
    pub ground_truth: String,
}

/// Evaluation rows, in the order the questions were prepared.
#[derive(Debug, Clone, Default)]
pub struct EvaluationDataSet(Vec<EvaluationData>);

impl Ragas {
    pub fn from_prepared_questions(questions: impl Into<EvaluationDataSet>) -> Self {
        Ragas {
            dataset: Arc::new(RwLock::new(questions.into())),
        }
    }

    /// Questions in the order they were prepared.
    pub async fn questions(&self) -> Vec<String> {
        self.dataset
            .read()
            .await
            .0
            .iter()
            .map(|data| data.question.clone())
            .collect()
    }

    /// Snapshot of the collected rows.
    pub async fn records(&self) -> Vec<EvaluationData> {
        self.dataset.read().await.0.clone()
    }

    pub async fn to_json(&self) -> String {
        self.dataset.read().await.to_json()
    }

    /// Writes the dataset as json to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Errors if the file cannot be written.
    pub async fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs_err::tokio::create_dir_all(parent).await?;
        }

        fs_err::tokio::write(path, self.to_json().await)
            .await
            .context("Failed to write ragas dataset")?;

        tracing::info!(path = %path.display(), "Wrote ragas dataset");
        Ok(())
    }
}

#[async_trait]
impl EvaluateQuery for Ragas {
    #[tracing::instrument(skip_all)]
    async fn evaluate(&self, query: QueryEvaluation) -> Result<()> {
        let mut dataset = self.dataset.write().await;
        dataset.upsert_evaluation(&query)
    }
}

impl EvaluationDataSet {
    /// # Errors
    ///
    /// Errors if the question was not prepared.
    pub fn upsert_evaluation(&mut self, query: &QueryEvaluation) -> Result<()> {
        match query {
            QueryEvaluation::RetrieveDocuments(query) => self.upsert_retrieved_documents(query),
            QueryEvaluation::AnswerQuery(query) => self.upsert_answer(query),
        }
    }

    fn get_mut(&mut self, question: &str) -> Result<&mut EvaluationData> {
        self.0
            .iter_mut()
            .find(|data| data.question == question)
            .ok_or_else(|| anyhow::anyhow!("Question not found: {question}"))
    }

    fn upsert_retrieved_documents(&mut self, query: &Query<states::Retrieved>) -> Result<()> {
        self.get_mut(query.original())?.contexts = query.contexts();
        Ok(())
    }

    fn upsert_answer(&mut self, query: &Query<states::Answered>) -> Result<()> {
        let data = self.get_mut(query.original())?;

        data.answer = query.answer().to_string();
        data.contexts = query
            .documents()
            .iter()
            .map(|document| document.text().to_string())
            .collect();

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Outputs json for ragas
    ///
    /// # Format
    ///
    /// ```json
    /// [
    ///   {
    ///   "question": "What is the capital of France?",
    ///   "answer": "Paris",
    ///   "contexts": ["Paris is the capital of France"],
    ///   "ground_truth": "Paris"
    ///   }
    /// ]
    /// ```
    pub fn to_json(&self) -> String {
        json!(self.0).to_string()
    }
}

// Can just do a list of questions leaving ground truth, answers, contexts empty
impl From<Vec<String>> for EvaluationDataSet {
    fn from(val: Vec<String>) -> Self {
        val.into_iter()
            .map(|question| EvaluationCase::new(question, String::new()))
            .collect::<Vec<_>>()
            .into()
    }
}

// Can take a list of tuples for questions and ground truths
impl From<Vec<(String, String)>> for EvaluationDataSet {
    fn from(val: Vec<(String, String)>) -> Self {
        val.into_iter()
            .map(|(question, ground_truth)| EvaluationCase::new(question, ground_truth))
            .collect::<Vec<_>>()
            .into()
    }
}

impl From<Vec<EvaluationCase>> for EvaluationDataSet {
    fn from(val: Vec<EvaluationCase>) -> Self {
        let mut rows: Vec<EvaluationData> = Vec::with_capacity(val.len());

        for case in val {
            if rows.iter().any(|row| row.question == case.question) {
                tracing::warn!(question = %case.question, "Ignoring duplicate evaluation question");
                continue;
            }
            rows.push(EvaluationData {
                question: case.question,
                ground_truth: case.ground_truth,
                ..EvaluationData::default()
            });
        }

        EvaluationDataSet(rows)
    }
}
