use std::sync::{Arc, LazyLock};

use anyhow::{Context as _, Result};
use derive_builder::Builder;
use ragline_core::{util::cosine_similarity, Chunk, EmbeddingModel};
use regex::Regex;

pub const DEFAULT_BREAKPOINT_PERCENTILE: f32 = 95.0;
pub const DEFAULT_BUFFER_SIZE: usize = 1;

static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.?!]\s+").expect("valid sentence regex"));

/// Splits text where the meaning shifts.
///
/// The text is split into sentences. Every sentence is embedded together with `buffer_size`
/// neighbours on each side, and the cosine distance between consecutive windows is computed. A
/// new chunk starts after every sentence whose distance to the next exceeds the
/// `breakpoint_percentile` of all distances.
///
/// Metadata and path of the input chunk are kept on every output chunk.
#[derive(Clone, Builder)]
#[builder(setter(into), build_fn(error = "anyhow::Error"))]
pub struct SemanticChunker {
    #[builder(setter(custom))]
    embed_model: Arc<dyn EmbeddingModel>,
    /// Percentile (0-100) of the distances above which a chunk is split
    #[builder(default = "DEFAULT_BREAKPOINT_PERCENTILE")]
    breakpoint_percentile: f32,
    /// Neighbouring sentences on each side embedded with a sentence
    #[builder(default = "DEFAULT_BUFFER_SIZE")]
    buffer_size: usize,
}

impl std::fmt::Debug for SemanticChunker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemanticChunker")
            .field("embed_model", &self.embed_model.name())
            .field("breakpoint_percentile", &self.breakpoint_percentile)
            .field("buffer_size", &self.buffer_size)
            .finish()
    }
}

impl SemanticChunkerBuilder {
    pub fn embed_model(&mut self, model: impl EmbeddingModel + 'static) -> &mut Self {
        self.embed_model = Some(Arc::new(model));
        self
    }
}

impl SemanticChunker {
    pub fn builder() -> SemanticChunkerBuilder {
        SemanticChunkerBuilder::default()
    }

    /// Chunker with the default percentile and buffer size.
    pub fn new(embed_model: Arc<dyn EmbeddingModel>) -> Self {
        Self {
            embed_model,
            breakpoint_percentile: DEFAULT_BREAKPOINT_PERCENTILE,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    #[must_use]
    pub fn with_breakpoint_percentile(mut self, percentile: f32) -> Self {
        self.breakpoint_percentile = percentile.clamp(0.0, 100.0);
        self
    }

    /// Splits a single chunk.
    ///
    /// # Errors
    ///
    /// Errors if the sentence windows cannot be embedded.
    #[tracing::instrument(skip_all, name = "chunkers.semantic", fields(path = %chunk.path.display()))]
    pub async fn chunk(&self, chunk: Chunk) -> Result<Vec<Chunk>> {
        let sentences = split_sentences(&chunk.text);

        if sentences.len() <= 1 {
            return Ok(sentences
                .into_iter()
                .map(|sentence| with_text(&chunk, sentence))
                .collect());
        }

        let windows = windows(&sentences, self.buffer_size);
        let embeddings = self
            .embed_model
            .embed(windows)
            .await
            .context("Failed to embed sentences")?;

        anyhow::ensure!(
            embeddings.len() == sentences.len(),
            "Expected {} embeddings, got {}",
            sentences.len(),
            embeddings.len()
        );

        let distances = embeddings
            .windows(2)
            .map(|pair| 1.0 - cosine_similarity(&pair[0], &pair[1]))
            .collect::<Vec<_>>();
        let threshold = percentile(&distances, self.breakpoint_percentile);

        let mut chunks = Vec::new();
        let mut start = 0;
        for (index, distance) in distances.iter().enumerate() {
            if *distance > threshold {
                chunks.push(with_text(&chunk, sentences[start..=index].join(" ")));
                start = index + 1;
            }
        }
        chunks.push(with_text(&chunk, sentences[start..].join(" ")));

        tracing::debug!(
            sentences = sentences.len(),
            chunks = chunks.len(),
            threshold,
            "Split semantically"
        );

        Ok(chunks)
    }

    /// Splits every chunk, keeping their order.
    ///
    /// # Errors
    ///
    /// Errors on the first chunk that fails to split.
    pub async fn chunk_all(&self, chunks: Vec<Chunk>) -> Result<Vec<Chunk>> {
        let mut result = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            result.extend(self.chunk(chunk).await?);
        }
        Ok(result)
    }
}

fn with_text(source: &Chunk, text: impl Into<String>) -> Chunk {
    Chunk {
        text: text.into(),
        ..source.clone()
    }
}

/// Sentences ending in `.`, `?` or `!` followed by whitespace. Empty sentences are dropped.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for boundary in SENTENCE_END.find_iter(text) {
        // Keep the punctuation, drop the whitespace
        sentences.push(&text[start..=boundary.start()]);
        start = boundary.end();
    }
    sentences.push(&text[start..]);

    sentences
        .into_iter()
        .map(str::trim)
        .filter(|sentence| !sentence.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn windows(sentences: &[String], buffer_size: usize) -> Vec<String> {
    (0..sentences.len())
        .map(|i| {
            let from = i.saturating_sub(buffer_size);
            let to = (i + buffer_size + 1).min(sentences.len());
            sentences[from..to].join(" ")
        })
        .collect()
}

/// Percentile with linear interpolation between the closest ranks.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn percentile(values: &[f32], percentile: f32) -> f32 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f32::total_cmp);

    let rank = (percentile.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f32;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;

    sorted[lower] + (sorted[upper] - sorted[lower]) * (rank - lower as f32)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use ragline_core::{Embeddings, LanguageModelError};
    use serde_json::json;
    use test_case::test_case;

    use super::*;

    /// Two dimensional topic embedding: (mentions of "cat", mentions of "stock"), normalised.
    struct TopicEmbedder;

    #[async_trait]
    impl EmbeddingModel for TopicEmbedder {
        async fn embed(&self, input: Vec<String>) -> Result<Embeddings, LanguageModelError> {
            Ok(input
                .iter()
                .map(|text| {
                    let text = text.to_lowercase();
                    #[allow(clippy::cast_precision_loss)]
                    let v = [
                        text.matches("cat").count() as f32,
                        text.matches("stock").count() as f32,
                    ];
                    let norm = (v[0] * v[0] + v[1] * v[1]).sqrt().max(1.0);
                    vec![v[0] / norm, v[1] / norm]
                })
                .collect())
        }
    }

    fn chunker() -> SemanticChunker {
        SemanticChunker::new(Arc::new(TopicEmbedder))
    }

    #[test_case("One. Two? Three! Four", &["One.", "Two?", "Three!", "Four"]; "mixed punctuation")]
    #[test_case("3.14 is pi. Yes.", &["3.14 is pi.", "Yes."]; "decimal point")]
    #[test_case("  ", &[]; "blank")]
    fn test_split_sentences(text: &str, expected: &[&str]) {
        assert_eq!(split_sentences(text), expected);
    }

    #[test]
    fn test_windows() {
        let sentences = ["a", "b", "c"].map(String::from);
        assert_eq!(windows(&sentences, 1), vec!["a b", "a b c", "b c"]);
    }

    #[test]
    fn test_percentile_interpolates() {
        assert!((percentile(&[1.0, 2.0, 3.0, 4.0], 50.0) - 2.5).abs() < 1e-6);
        assert!((percentile(&[0.2, 0.1], 100.0) - 0.2).abs() < 1e-6);
        assert!((percentile(&[0.2, 0.1], 0.0) - 0.1).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_splits_on_topic_shift() {
        let chunk = Chunk::new("Cats purr. Cats meow. Stocks fell. Stocks rose.")
            .with_path("notes.pdf")
            .with_metadata([("page_number", json!(1))]);

        let chunks = chunker().chunk(chunk).await.unwrap();
        let texts = chunks.iter().map(|c| c.text.as_str()).collect::<Vec<_>>();

        assert_eq!(texts, vec!["Cats purr. Cats meow.", "Stocks fell. Stocks rose."]);
        assert!(chunks
            .iter()
            .all(|c| c.metadata.get("page_number") == Some(&json!(1))));
        assert!(chunks.iter().all(|c| c.path.to_string_lossy() == "notes.pdf"));
    }

    #[tokio::test]
    async fn test_single_sentence_is_one_chunk() {
        let chunks = chunker().chunk(Chunk::new("Just one cat.")).await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Just one cat.");
    }

    #[tokio::test]
    async fn test_empty_text_gives_no_chunks() {
        assert!(chunker().chunk(Chunk::new("")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_builder() {
        let chunker = SemanticChunker::builder()
            .embed_model(TopicEmbedder)
            .breakpoint_percentile(50.0_f32)
            .build()
            .unwrap();
        assert!((chunker.breakpoint_percentile - 50.0).abs() < f32::EPSILON);
    }
}
