//! Chat with the indexed documents, optionally running the configured evaluation first.
use std::sync::Arc;

use anyhow::{Context as _, Result};
use ragline::{
    cli::{is_exit, Prompter},
    indexing::HybridIndex,
    integrations::bm25::SparseEncoderStore,
    query::{
        answers::Simple,
        evaluators::{LlmJudge, Ragas},
        query_transformers::{Embed, SparseEmbed},
        search_strategies::HybridSearch,
        HybridRetriever, Pipeline,
    },
    services,
    traits::{EmbeddingModel, SimplePrompt, SparseEncoder},
    Settings,
};

/// Everything a query pipeline is assembled from.
struct Components {
    search: HybridSearch,
    embed_model: Arc<dyn EmbeddingModel>,
    sparse_encoder: Arc<dyn SparseEncoder>,
    prompt_model: Arc<dyn SimplePrompt>,
    retriever: HybridRetriever,
}

impl Components {
    fn pipeline(&self) -> Pipeline {
        Pipeline::from_search_strategy(self.search)
            .then_transform_query(Embed::new(self.embed_model.clone()))
            .then_transform_query(SparseEmbed::new(self.sparse_encoder.clone()))
            .then_retrieve(self.retriever.clone())
            .then_answer(Simple::new(self.prompt_model.clone()))
    }
}

async fn run_evaluation(settings: &Settings, components: &Components) -> Result<()> {
    if settings.evaluation.cases.is_empty() {
        println!("No evaluation cases configured, add them under [[evaluation.cases]]");
        return Ok(());
    }

    let ragas = Ragas::from_prepared_questions(settings.evaluation.cases.clone());
    let questions = ragas.questions().await;
    println!(
        "Starting batch evaluation of {} queries...",
        questions.len()
    );

    components
        .pipeline()
        .evaluate_with(ragas.clone())
        .query_all(questions)
        .await?;

    let report = LlmJudge::new(components.prompt_model.clone())
        .evaluate(&ragas.records().await)
        .await;

    println!("\n========== FINAL EVALUATION SUMMARY ==========");
    println!("{report}");

    if let Some(path) = &settings.evaluation.output_path {
        ragas.write_json(path).await?;
        println!("Evaluation data written to {}", path.display());
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    ragline::telemetry::init_tracing();
    println!("=== RETRIEVAL MODE ===");

    let settings = Settings::load()?;

    let sparse_encoder: Arc<dyn SparseEncoder> = Arc::new(
        SparseEncoderStore::new(&settings.indexing.sparse_model_path)
            .load_or_fail()
            .await
            .context("Cannot start retrieval without the sparse encoder, run ragline-index first")?,
    );
    let embed_model = services::embed_model(&settings)?;

    let index = HybridIndex::new(
        services::vector_store(&settings)?,
        embed_model.clone(),
        sparse_encoder.clone(),
    )
    .with_batch_size(settings.indexing.batch_size);

    let components = Components {
        search: settings.search_strategy()?,
        embed_model,
        sparse_encoder,
        prompt_model: services::prompt_model(&settings)?,
        retriever: HybridRetriever::connect(index, &settings.index_spec()).await?,
    };

    let mut prompter = Prompter::default();

    if prompter.confirm("Run evaluation? (y/n): ").await? {
        if let Err(error) = run_evaluation(&settings, &components).await {
            tracing::error!(error = format!("{error:#}"), "Evaluation failed");
        }
    }

    let pipeline = components.pipeline();
    while let Some(question) = prompter.ask("\nAsk: ").await? {
        let question = question.trim();
        if is_exit(question) {
            break;
        }
        if question.is_empty() {
            continue;
        }

        match pipeline.query(question).await {
            Ok(answered) => println!("\n{}", answered.answer()),
            Err(error) => tracing::error!(error = format!("{error:#}"), "Query failed"),
        }
    }

    Ok(())
}
