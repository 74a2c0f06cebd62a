use std::sync::{Arc, LazyLock};

use ragline_core::{prompt::Prompt, SimplePrompt};
use regex::Regex;
use strum::IntoEnumIterator as _;

use super::{
    ragas::EvaluationData,
    report::{EvaluationReport, MetricScores, QuestionScores},
};

static SCORE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d+(?:\.\d+)?").expect("valid score regex"));

/// Quality metrics graded by the judge, each a score in `[0, 1]`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    strum_macros::Display,
    strum_macros::EnumIter,
    strum_macros::AsRefStr,
    serde::Serialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Share of the retrieved contexts that are relevant for the expected answer
    ContextPrecision,
    /// Share of the expected answer that is supported by the retrieved contexts
    ContextRecall,
    /// Share of the claims in the answer that are supported by the retrieved contexts
    Faithfulness,
    /// How directly the answer addresses the question
    AnswerRelevancy,
}

impl Metric {
    /// Whether grading needs the expected answer.
    pub fn needs_ground_truth(self) -> bool {
        matches!(self, Metric::ContextPrecision | Metric::ContextRecall)
    }

    fn prompt(self, data: &EvaluationData) -> Prompt {
        let template = match self {
            Metric::ContextPrecision => indoc::indoc! {"
            Rate which share of the numbered contexts below is useful to arrive at the expected
            answer of the question. Contexts listed first weigh more.

            Question: {{ question }}
            Expected answer: {{ ground_truth }}

            {% for context in contexts %}Context {{ loop.index }}:
            {{ context }}

            {% endfor %}
            Respond with a single number between 0 and 1 and nothing else.
            "},
            Metric::ContextRecall => indoc::indoc! {"
            Rate which share of the statements in the expected answer can be attributed to the
            contexts below.

            Question: {{ question }}
            Expected answer: {{ ground_truth }}

            {% for context in contexts %}Context {{ loop.index }}:
            {{ context }}

            {% endfor %}
            Respond with a single number between 0 and 1 and nothing else.
            "},
            Metric::Faithfulness => indoc::indoc! {"
            Rate which share of the claims made in the answer can be inferred from the contexts
            below. Claims that cannot be verified from the contexts count as unsupported.

            Question: {{ question }}
            Answer: {{ answer }}

            {% for context in contexts %}Context {{ loop.index }}:
            {{ context }}

            {% endfor %}
            Respond with a single number between 0 and 1 and nothing else.
            "},
            Metric::AnswerRelevancy => indoc::indoc! {"
            Rate how directly and completely the answer addresses the question. Evasive, partial
            or off topic answers score low.

            Question: {{ question }}
            Answer: {{ answer }}

            Respond with a single number between 0 and 1 and nothing else.
            "},
        };

        Prompt::from(template)
            .with_context_value("question", data.question.as_str())
            .with_context_value("answer", data.answer.as_str())
            .with_context_value("ground_truth", data.ground_truth.as_str())
            .with_context_value("contexts", data.contexts.clone())
    }
}

/// Extracts the last number from a judge reply if it lies within `[0, 1]`.
///
/// Judges tend to restate the scale before the score, so earlier numbers are ignored.
///
/// ```
/// # use ragline_query::evaluators::parse_score;
/// assert_eq!(parse_score("Score: 0.75"), Some(0.75));
/// assert_eq!(parse_score("7 out of 10"), None);
/// assert_eq!(parse_score("I cannot tell"), None);
/// ```
pub fn parse_score(reply: &str) -> Option<f32> {
    SCORE
        .find_iter(reply)
        .last()
        .and_then(|score| score.as_str().parse::<f32>().ok())
        .filter(|score| (0.0..=1.0).contains(score))
}

/// Grades evaluation rows with an llm.
///
/// A metric that cannot be graded (model failure, unparsable reply, missing ground truth) is
/// reported as `None` instead of failing the batch. Rows without an answer or without contexts
/// are skipped altogether.
#[derive(Clone)]
pub struct LlmJudge {
    client: Arc<dyn SimplePrompt>,
    metrics: Vec<Metric>,
}

impl std::fmt::Debug for LlmJudge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmJudge")
            .field("client", &self.client.name())
            .field("metrics", &self.metrics)
            .finish()
    }
}

impl LlmJudge {
    /// Judge grading every [`Metric`].
    pub fn new(client: Arc<dyn SimplePrompt>) -> Self {
        Self {
            client,
            metrics: Metric::iter().collect(),
        }
    }

    pub fn from_client(client: impl SimplePrompt + 'static) -> Self {
        Self::new(Arc::new(client))
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: impl IntoIterator<Item = Metric>) -> Self {
        self.metrics = metrics.into_iter().collect();
        self.metrics.sort();
        self.metrics.dedup();
        self
    }

    /// Grades a single row, or returns `None` if it cannot be evaluated.
    #[tracing::instrument(skip_all, fields(question = %data.question))]
    pub async fn judge(&self, data: &EvaluationData) -> Option<MetricScores> {
        if data.answer.trim().is_empty() {
            tracing::warn!("Skipping evaluation due to empty answer");
            return None;
        }
        if data.contexts.is_empty() {
            tracing::warn!("Skipping evaluation due to empty contexts");
            return None;
        }

        let mut scores = MetricScores::default();
        for metric in &self.metrics {
            scores.insert(*metric, self.grade(*metric, data).await);
        }
        Some(scores)
    }

    async fn grade(&self, metric: Metric, data: &EvaluationData) -> Option<f32> {
        if metric.needs_ground_truth() && data.ground_truth.trim().is_empty() {
            tracing::debug!(%metric, "No ground truth, not graded");
            return None;
        }

        let reply = match self.client.prompt(metric.prompt(data)).await {
            Ok(reply) => reply,
            Err(error) => {
                tracing::warn!(%metric, %error, "Failed to grade metric");
                return None;
            }
        };

        let score = parse_score(&reply);
        if score.is_none() {
            tracing::warn!(%metric, reply = %reply, "Judge reply is not a score");
        }
        score
    }

    /// Grades every row, in order.
    pub async fn evaluate(&self, dataset: &[EvaluationData]) -> EvaluationReport {
        let mut report = EvaluationReport::new(self.metrics.clone());

        for data in dataset {
            match self.judge(data).await {
                Some(scores) => report.push(QuestionScores {
                    question: data.question.clone(),
                    scores,
                }),
                None => report.skip(&data.question),
            }
        }

        tracing::info!(
            graded = report.rows().len(),
            skipped = report.skipped().len(),
            "Evaluation complete"
        );
        report
    }
}
