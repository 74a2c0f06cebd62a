//! Indexes a PDF or CSV document for hybrid retrieval.
//!
//! Usage: `ragline-index [path]`, falling back to `indexing.document_path`.
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use ragline::{
    cli::RULE, indexing::Pipeline, integrations::bm25::SparseEncoderStore, services, Settings,
};

#[tokio::main]
async fn main() -> Result<()> {
    ragline::telemetry::init_tracing();

    let settings = Settings::load()?;
    let document = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| settings.indexing.document_path.clone())
        .context("No document to index, pass a path or set indexing.document_path")?;

    println!("{RULE}");
    println!("Indexing {}", document.display());
    println!("{RULE}");

    let report = Pipeline::builder()
        .store(services::vector_store(&settings)?)
        .embed_model(services::embed_model(&settings)?)
        .index_spec(settings.index_spec())
        .sparse_store(SparseEncoderStore::new(
            &settings.indexing.sparse_model_path,
        ))
        .breakpoint_percentile(settings.indexing.breakpoint_percentile)
        .batch_size(settings.indexing.batch_size)
        .build()?
        .run(&document)
        .await?;

    if report.is_empty() {
        println!("No chunks were created from {}", document.display());
        return Ok(());
    }

    println!(
        "Indexed {} chunks into '{}' ({} upserted)",
        report.chunks, report.index, report.upserted
    );
    if !report.sparse_state_persisted {
        anyhow::bail!(
            "The sparse encoder could not be written to {}. The index was updated, but \
             ragline-chat will refuse to start until indexing succeeds again",
            settings.indexing.sparse_model_path.display()
        );
    }

    Ok(())
}
