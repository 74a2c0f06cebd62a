//! Index a small corpus, answer prepared questions and grade them.
use std::sync::Arc;

use pretty_assertions::assert_eq;
use ragline_core::{
    querying::search_strategies::HybridSearch,
    vector_store::{IndexSpec, Metric as IndexMetric, VectorStore},
    Chunk, EmbeddingModel, HybridIndex, SimplePrompt, SparseEncoder,
};
use ragline_integrations::{bm25::Bm25Encoder, memory::MemoryStore};
use ragline_query::{
    answers,
    evaluators::{EvaluationCase, LlmJudge, Metric, Ragas},
    query_transformers, HybridRetriever, Pipeline,
};
use ragline_test_utils::{FakeEmbedder, ScriptedPrompt};

const CORPUS: [&str; 3] = [
    "The cat sat on the mat.",
    "Dogs chase the ball in the park.",
    "Stock markets fell sharply today.",
];

struct Setup {
    pipeline: Pipeline,
    ragas: Ragas,
    llm: ScriptedPrompt,
}

async fn setup(llm: ScriptedPrompt, cases: Vec<EvaluationCase>) -> Setup {
    let store: Arc<dyn VectorStore> = Arc::new(MemoryStore::new());
    let embed: Arc<dyn EmbeddingModel> = Arc::new(FakeEmbedder::new(64));
    let sparse: Arc<dyn SparseEncoder> = Arc::new(Bm25Encoder::fit(&CORPUS).unwrap());

    let index = HybridIndex::new(store, embed.clone(), sparse.clone());
    let retriever = HybridRetriever::connect(
        index.clone(),
        &IndexSpec::new("rag-agent", 64, IndexMetric::Dotproduct),
    )
    .await
    .unwrap();
    index
        .add_chunks(retriever.handle(), &CORPUS.map(Chunk::new))
        .await
        .unwrap();

    let ragas = Ragas::from_prepared_questions(cases);
    let client: Arc<dyn SimplePrompt> = Arc::new(llm.clone());

    let pipeline = Pipeline::from_search_strategy(HybridSearch::new(0.5, 1).unwrap())
        .then_transform_query(query_transformers::Embed::new(embed))
        .then_transform_query(query_transformers::SparseEmbed::new(sparse))
        .then_retrieve(retriever)
        .then_answer(answers::Simple::new(client))
        .evaluate_with(ragas.clone());

    Setup {
        pipeline,
        ragas,
        llm,
    }
}

#[test_log::test(tokio::test)]
async fn test_answers_from_retrieved_context() {
    let Setup { pipeline, llm, .. } = setup(
        ScriptedPrompt::new().reply("The cat sat on the mat."),
        vec![EvaluationCase::new("Where did the cat sit?", "On the mat")],
    )
    .await;

    let answered = pipeline.query("Where did the cat sit?").await.unwrap();

    assert_eq!(answered.answer(), "The cat sat on the mat.");
    assert_eq!(answered.documents().len(), 1);
    assert_eq!(answered.documents()[0].text(), "The cat sat on the mat.");

    let prompt = &llm.received()[0];
    assert!(prompt.contains("Where did the cat sit?"));
    assert!(prompt.contains("---\nThe cat sat on the mat.\n---"));
}

#[test_log::test(tokio::test)]
async fn test_evaluates_prepared_questions() {
    let cases = vec![
        EvaluationCase::new("Where did the cat sit?", "On the mat"),
        EvaluationCase::new("What did the stock markets do?", "They fell"),
    ];
    let Setup {
        pipeline, ragas, ..
    } = setup(
        ScriptedPrompt::new()
            .reply("On the mat.")
            .reply("They fell sharply."),
        cases,
    )
    .await;

    pipeline.query_all(ragas.questions().await).await.unwrap();

    let records = ragas.records().await;
    assert_eq!(records[0].answer, "On the mat.");
    assert_eq!(records[0].contexts, vec!["The cat sat on the mat."]);
    assert_eq!(records[1].contexts, vec!["Stock markets fell sharply today."]);

    let judge = LlmJudge::from_client(ScriptedPrompt::with_fallback("0.8"))
        .with_metrics([Metric::Faithfulness, Metric::ContextRecall]);
    let report = judge.evaluate(&records).await;

    assert_eq!(report.rows().len(), 2);
    assert!(report.skipped().is_empty());
    assert_eq!(report.mean(Metric::Faithfulness), Some(0.8));
    assert_eq!(report.mean(Metric::AnswerRelevancy), None);
}

#[tokio::test]
async fn test_unprepared_question_fails_evaluation() {
    let Setup { pipeline, .. } = setup(ScriptedPrompt::with_fallback("ok"), vec![]).await;

    let err = pipeline.query("Who chases the ball?").await.unwrap_err();

    assert!(format!("{err:#}").contains("Question not found"));
}
