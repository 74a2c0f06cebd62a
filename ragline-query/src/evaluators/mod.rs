/*!
Evaluators measure the quality of the query pipeline.

[`Ragas`] implements [`ragline_core::EvaluateQuery`] and collects the question, answer, retrieved
contexts and ground truth of every evaluated query. The collected dataset can be exported as json
for an external ragas run, or graded in process by an [`LlmJudge`] into an
[`EvaluationReport`].
*/
mod llm_judge;
mod ragas;
mod report;

pub use llm_judge::{parse_score, LlmJudge, Metric};
pub use ragas::{EvaluationCase, EvaluationData, EvaluationDataSet, Ragas};
pub use report::{EvaluationReport, MetricScores, QuestionScores};
