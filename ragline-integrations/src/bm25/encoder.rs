use std::{
    collections::{BTreeMap, HashSet},
    hash::Hasher as _,
};

use ragline_core::{
    errors::SparseEncoderError, SparseEmbedding, SparseEmbeddings, SparseEncoder,
};
use serde::{Deserialize, Serialize};
use twox_hash::XxHash64;

use super::tokenizer::tokenize;

pub const DEFAULT_K1: f32 = 1.2;
pub const DEFAULT_B: f32 = 0.75;

/// Fitted corpus statistics. This is what gets persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bm25State {
    pub n_docs: u32,
    /// Average document length in tokens
    pub avgdl: f32,
    /// Number of documents containing each hashed term
    pub doc_freq: BTreeMap<u32, u32>,
    pub k1: f32,
    pub b: f32,
}

impl Bm25State {
    /// Checks the statistics are usable for scoring.
    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.n_docs == 0 {
            return Err("n_docs must be positive".to_string());
        }
        if !self.avgdl.is_finite() || self.avgdl <= 0.0 {
            return Err(format!("invalid average document length {}", self.avgdl));
        }
        if !self.k1.is_finite() || self.k1 < 0.0 || !(0.0..=1.0).contains(&self.b) {
            return Err(format!("invalid parameters k1={} b={}", self.k1, self.b));
        }
        if let Some((term, df)) = self.doc_freq.iter().find(|(_, df)| **df > self.n_docs) {
            return Err(format!(
                "term {term} appears in {df} documents, more than the {} fitted",
                self.n_docs
            ));
        }
        Ok(())
    }
}

/// BM25 sparse encoder.
///
/// Terms are hashed to `u32` indices, so no vocabulary is stored. Documents are weighted by
/// saturated term frequency, queries by normalised inverse document frequency; the dot product
/// of the two is the BM25 score.
#[derive(Debug, Clone, PartialEq)]
pub struct Bm25Encoder {
    state: Bm25State,
}

fn term_index(token: &str) -> u32 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(token.as_bytes());
    // Indices are u32 on the wire
    #[allow(clippy::cast_possible_truncation)]
    let index = hasher.finish() as u32;
    index
}

fn term_frequencies(text: &str) -> (BTreeMap<u32, u32>, usize) {
    let tokens = tokenize(text);
    let mut frequencies = BTreeMap::new();
    for token in &tokens {
        *frequencies.entry(term_index(token)).or_insert(0) += 1;
    }
    (frequencies, tokens.len())
}

impl Bm25Encoder {
    /// Fits the encoder with the default parameters.
    ///
    /// # Errors
    ///
    /// Returns [`SparseEncoderError::EmptyCorpus`] if `corpus` is empty.
    pub fn fit<S: AsRef<str>>(corpus: &[S]) -> Result<Self, SparseEncoderError> {
        Self::fit_with_params(corpus, DEFAULT_K1, DEFAULT_B)
    }

    /// # Errors
    ///
    /// Returns [`SparseEncoderError::EmptyCorpus`] if `corpus` is empty.
    #[allow(clippy::cast_precision_loss)]
    pub fn fit_with_params<S: AsRef<str>>(
        corpus: &[S],
        k1: f32,
        b: f32,
    ) -> Result<Self, SparseEncoderError> {
        if corpus.is_empty() {
            return Err(SparseEncoderError::EmptyCorpus);
        }

        let mut doc_freq = BTreeMap::new();
        let mut total_len = 0;

        for text in corpus {
            let (frequencies, len) = term_frequencies(text.as_ref());
            total_len += len;
            for term in frequencies.into_keys() {
                *doc_freq.entry(term).or_insert(0) += 1;
            }
        }

        let n_docs = u32::try_from(corpus.len()).unwrap_or(u32::MAX);
        // Documents made only of stopwords still count; avoid a zero average
        let avgdl = (total_len as f32 / corpus.len() as f32).max(1.0);

        tracing::debug!(n_docs, avgdl, terms = doc_freq.len(), "Fitted BM25");

        Ok(Self {
            state: Bm25State {
                n_docs,
                avgdl,
                doc_freq,
                k1,
                b,
            },
        })
    }

    /// Restores an encoder from persisted statistics.
    ///
    /// # Errors
    ///
    /// Errors with a description if the statistics are unusable.
    pub fn from_state(state: Bm25State) -> Result<Self, String> {
        state.validate()?;
        Ok(Self { state })
    }

    pub fn state(&self) -> &Bm25State {
        &self.state
    }

    #[allow(clippy::cast_precision_loss)]
    fn encode_document(&self, text: &str) -> SparseEmbedding {
        let Bm25State { avgdl, k1, b, .. } = self.state;
        let (frequencies, len) = term_frequencies(text);
        let norm = k1 * (1.0 - b + b * len as f32 / avgdl);

        let (indices, values) = frequencies
            .into_iter()
            .map(|(term, tf)| {
                let tf = tf as f32;
                (term, tf / (norm + tf))
            })
            .unzip();

        SparseEmbedding { indices, values }
    }
}

impl SparseEncoder for Bm25Encoder {
    fn encode_documents(&self, texts: &[String]) -> SparseEmbeddings {
        texts.iter().map(|text| self.encode_document(text)).collect()
    }

    fn encode_queries(&self, texts: &[String]) -> SparseEmbeddings {
        texts.iter().map(|text| self.encode_query(text)).collect()
    }

    #[allow(clippy::cast_precision_loss)]
    fn encode_query(&self, text: &str) -> SparseEmbedding {
        let n_docs = self.state.n_docs as f32;

        let mut seen = HashSet::new();
        let (indices, idfs): (Vec<u32>, Vec<f32>) = tokenize(text)
            .iter()
            .map(|token| term_index(token))
            .filter(|term| seen.insert(*term))
            .map(|term| {
                // Unseen terms are weighted as if they appeared once
                let df = self.state.doc_freq.get(&term).copied().unwrap_or(1) as f32;
                (term, ((n_docs + 1.0) / (df + 0.5)).ln())
            })
            .unzip();

        let total = idfs.iter().sum::<f32>();
        let values = if total > 0.0 {
            idfs.into_iter().map(|idf| idf / total).collect()
        } else {
            idfs
        };

        SparseEmbedding { indices, values }
    }
}
