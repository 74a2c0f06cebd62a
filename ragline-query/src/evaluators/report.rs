use std::{collections::BTreeMap, fmt};

use itertools::Itertools as _;
use serde::Serialize;

use super::llm_judge::Metric;

/// Scores of one question. `None` marks a metric that could not be graded.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MetricScores(BTreeMap<Metric, Option<f32>>);

impl MetricScores {
    pub fn insert(&mut self, metric: Metric, score: Option<f32>) {
        self.0.insert(metric, score);
    }

    pub fn get(&self, metric: Metric) -> Option<f32> {
        self.0.get(&metric).copied().flatten()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Metric, Option<f32>)> + '_ {
        self.0.iter().map(|(metric, score)| (*metric, *score))
    }
}

impl<const N: usize> From<[(Metric, Option<f32>); N]> for MetricScores {
    fn from(scores: [(Metric, Option<f32>); N]) -> Self {
        Self(scores.into_iter().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionScores {
    pub question: String,
    pub scores: MetricScores,
}

/// Graded questions plus the questions that were skipped.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EvaluationReport {
    metrics: Vec<Metric>,
    rows: Vec<QuestionScores>,
    skipped: Vec<String>,
}

impl EvaluationReport {
    pub fn new(metrics: Vec<Metric>) -> Self {
        Self {
            metrics,
            ..Default::default()
        }
    }

    pub fn push(&mut self, row: QuestionScores) {
        self.rows.push(row);
    }

    pub fn skip(&mut self, question: impl Into<String>) {
        self.skipped.push(question.into());
    }

    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    pub fn rows(&self) -> &[QuestionScores] {
        &self.rows
    }

    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Mean over the questions where `metric` was graded.
    #[allow(clippy::cast_precision_loss)]
    pub fn mean(&self, metric: Metric) -> Option<f32> {
        let scores = self
            .rows
            .iter()
            .filter_map(|row| row.scores.get(metric))
            .collect::<Vec<_>>();

        if scores.is_empty() {
            return None;
        }
        Some(scores.iter().sum::<f32>() / scores.len() as f32)
    }

    pub fn means(&self) -> Vec<(Metric, Option<f32>)> {
        self.metrics
            .iter()
            .map(|metric| (*metric, self.mean(*metric)))
            .collect()
    }
}

fn cell(score: Option<f32>) -> String {
    score.map_or_else(|| "-".to_string(), |score| format!("{score:.2}"))
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "| question | {} |",
            self.metrics.iter().map(AsRef::<str>::as_ref).join(" | ")
        )?;
        writeln!(f, "|---|{}", "---|".repeat(self.metrics.len()))?;

        for row in &self.rows {
            writeln!(
                f,
                "| {} | {} |",
                row.question.replace('|', "\\|"),
                self.metrics
                    .iter()
                    .map(|metric| cell(row.scores.get(*metric)))
                    .join(" | ")
            )?;
        }

        writeln!(
            f,
            "| **mean** | {} |",
            self.means()
                .into_iter()
                .map(|(_, mean)| cell(mean))
                .join(" | ")
        )?;

        if !self.skipped.is_empty() {
            writeln!(f, "\nSkipped: {}", self.skipped.iter().join(", "))?;
        }

        Ok(())
    }
}
