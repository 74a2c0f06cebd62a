#![allow(clippy::missing_panics_doc)]
//! Deterministic test doubles for the model traits.
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;

use crate::{
    errors::LanguageModelError, indexing_traits::EmbeddingModel, prompt::Prompt, Embeddings,
    SimplePrompt,
};

/// Bag of words embedder: every lowercase alphanumeric word is hashed (FNV-1a) into one of
/// `dimension` buckets, and the result is L2 normalised.
///
/// Texts sharing words end up close together, which is all a retrieval test needs.
#[derive(Debug, Clone)]
pub struct FakeEmbedder {
    dimension: usize,
    calls: Arc<Mutex<Vec<Vec<String>>>>,
}

impl FakeEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
            calls: Arc::default(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Every batch received so far.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimension];

        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty())
        {
            let hash = word
                .to_lowercase()
                .bytes()
                .fold(0xcbf2_9ce4_8422_2325_u64, |hash, byte| {
                    (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
                });
            let bucket = usize::try_from(hash % self.dimension as u64).unwrap_or_default();
            vector[bucket] += 1.0;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl EmbeddingModel for FakeEmbedder {
    async fn embed(&self, input: Vec<String>) -> Result<Embeddings, LanguageModelError> {
        self.calls.lock().unwrap().push(input.clone());
        Ok(input.iter().map(|text| self.embed_one(text)).collect())
    }

    fn name(&self) -> &'static str {
        "FakeEmbedder"
    }
}

type Replies = Arc<Mutex<VecDeque<Result<String, String>>>>;

/// Replays canned completions in order and records the rendered prompts it received.
///
/// Once the script runs out, the fallback reply (if any) is returned; otherwise it panics.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPrompt {
    replies: Replies,
    fallback: Option<String>,
    received: Arc<Mutex<Vec<String>>>,
}

impl ScriptedPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answers with `reply` once the script is exhausted.
    pub fn with_fallback(reply: impl Into<String>) -> Self {
        Self {
            fallback: Some(reply.into()),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn reply(self, reply: impl Into<String>) -> Self {
        self.replies.lock().unwrap().push_back(Ok(reply.into()));
        self
    }

    /// Queues a transient failure.
    #[must_use]
    pub fn fail(self, message: impl Into<String>) -> Self {
        self.replies.lock().unwrap().push_back(Err(message.into()));
        self
    }

    pub fn received(&self) -> Vec<String> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl SimplePrompt for ScriptedPrompt {
    async fn prompt(&self, prompt: Prompt) -> Result<String, LanguageModelError> {
        let rendered = prompt.render()?;
        self.received.lock().unwrap().push(rendered);

        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(LanguageModelError::transient(message)),
            None => Ok(self
                .fallback
                .clone()
                .unwrap_or_else(|| panic!("ScriptedPrompt ran out of replies"))),
        }
    }

    fn name(&self) -> &'static str {
        "ScriptedPrompt"
    }
}
