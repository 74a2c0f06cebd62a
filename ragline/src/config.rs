//! Settings for the ragline binaries.
//!
//! Values are read from `ragline.toml` in the working directory and then from `RAGLINE_`
//! prefixed environment variables, with `__` separating nested keys:
//!
//! ```toml
//! [openai]
//! api_key = "sk-..."
//!
//! [retrieval]
//! top_k = 5
//! ```
//!
//! is equivalent to `RAGLINE_OPENAI__API_KEY=sk-...` and `RAGLINE_RETRIEVAL__TOP_K=5`. Every key
//! has a default except the API keys, which are only required by the binaries that use them.
use std::{path::PathBuf, time::Duration};

use anyhow::{Context as _, Result};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use ragline_core::{
    querying::search_strategies::HybridSearch,
    retry::RetryPolicy,
    vector_store::{IndexSpec, Metric},
};
use ragline_integrations::transport::TransportConfig;
use ragline_query::evaluators::EvaluationCase;
use secrecy::SecretString;
use serde::Deserialize;

pub const CONFIG_FILE: &str = "ragline.toml";
pub const ENV_PREFIX: &str = "RAGLINE_";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub openai: OpenAiSettings,
    pub pinecone: PineconeSettings,
    pub indexing: IndexingSettings,
    pub retrieval: RetrievalSettings,
    pub retry: RetrySettings,
    pub transport: TransportSettings,
    pub media: MediaSettings,
    pub evaluation: EvaluationSettings,
}

impl Settings {
    /// Loads `ragline.toml` (if present) merged with the environment.
    ///
    /// # Errors
    ///
    /// Errors if a value has the wrong type.
    pub fn load() -> Result<Self> {
        Self::from_figment(Self::figment())
    }

    /// The providers [`Settings::load`] reads from.
    pub fn figment() -> Figment {
        Figment::new()
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// # Errors
    ///
    /// Errors if the figment cannot be extracted into settings.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        figment
            .extract()
            .context("Failed to load ragline settings")
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry.policy()
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig::default()
            .with_verify_tls(self.transport.verify_tls)
            .with_timeout(Duration::from_secs(self.transport.timeout_secs))
    }

    pub fn index_spec(&self) -> IndexSpec {
        IndexSpec::new(
            &self.pinecone.index_name,
            self.pinecone.dimension,
            self.pinecone.metric,
        )
    }

    /// # Errors
    ///
    /// Errors if `retrieval.alpha` is outside of `[0, 1]`.
    pub fn search_strategy(&self) -> Result<HybridSearch> {
        HybridSearch::new(self.retrieval.alpha, self.retrieval.top_k)
            .context("Invalid retrieval settings")
    }

    /// # Errors
    ///
    /// Errors if no `OpenAI` key is configured.
    pub fn openai_api_key(&self) -> Result<&SecretString> {
        self.openai
            .api_key
            .as_ref()
            .context("Missing openai.api_key, set it in ragline.toml or RAGLINE_OPENAI__API_KEY")
    }

    /// # Errors
    ///
    /// Errors if no Pinecone key is configured.
    pub fn pinecone_api_key(&self) -> Result<&SecretString> {
        self.pinecone.api_key.as_ref().context(
            "Missing pinecone.api_key, set it in ragline.toml or RAGLINE_PINECONE__API_KEY",
        )
    }
}

/// Any `OpenAI` compatible endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpenAiSettings {
    pub api_base: String,
    pub api_key: Option<SecretString>,
    pub embed_model: String,
    pub prompt_model: String,
    pub vision_model: String,
    pub transcription_model: String,
    pub temperature: f32,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            api_key: None,
            embed_model: "text-embedding-3-large".to_string(),
            prompt_model: "gpt-4o-mini".to_string(),
            vision_model: "gpt-4o-mini".to_string(),
            transcription_model: ragline_media::DEFAULT_TRANSCRIPTION_MODEL.to_string(),
            temperature: ragline_integrations::openai::DEFAULT_TEMPERATURE,
        }
    }
}

impl OpenAiSettings {
    pub fn transcription_endpoint(&self) -> String {
        format!(
            "{}/audio/transcriptions",
            self.api_base.trim_end_matches('/')
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PineconeSettings {
    pub api_key: Option<SecretString>,
    pub api_base: String,
    pub index_name: String,
    /// Must match the output size of `openai.embed_model`
    pub dimension: u32,
    pub metric: Metric,
    pub cloud: String,
    pub region: String,
    pub namespace: Option<String>,
}

impl Default for PineconeSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: ragline_integrations::pinecone::DEFAULT_API_BASE.to_string(),
            index_name: "rag-agent".to_string(),
            dimension: 3072,
            metric: Metric::Dotproduct,
            cloud: "aws".to_string(),
            region: "us-east-1".to_string(),
            namespace: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndexingSettings {
    /// Document indexed when `ragline-index` is started without a path
    pub document_path: Option<PathBuf>,
    /// Where the fitted BM25 state is written by indexing and read by retrieval
    pub sparse_model_path: PathBuf,
    pub breakpoint_percentile: f32,
    pub batch_size: usize,
}

impl Default for IndexingSettings {
    fn default() -> Self {
        Self {
            document_path: None,
            sparse_model_path: PathBuf::from("data/bm25_values.json"),
            breakpoint_percentile: ragline_indexing::chunkers::DEFAULT_BREAKPOINT_PERCENTILE,
            batch_size: ragline_core::hybrid_index::DEFAULT_BATCH_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Weight of the dense score, the sparse score is weighted `1 - alpha`
    pub alpha: f32,
    pub top_k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            alpha: 0.5,
            top_k: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub deadline_ms: Option<u64>,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            initial_delay_ms: 1000,
            backoff_multiplier: policy.backoff_multiplier,
            deadline_ms: None,
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        let policy = RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.initial_delay_ms),
            self.backoff_multiplier,
        );

        match self.deadline_ms {
            Some(deadline) => policy.with_deadline(Duration::from_millis(deadline)),
            None => policy,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct TransportSettings {
    pub verify_tls: bool,
    pub timeout_secs: u64,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            verify_tls: true,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MediaSettings {
    /// Timeout of a single transcription upload
    pub transcription_timeout_secs: u64,
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl Default for MediaSettings {
    fn default() -> Self {
        Self {
            transcription_timeout_secs: 120,
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EvaluationSettings {
    pub cases: Vec<EvaluationCase>,
    /// Where the collected evaluation rows are written as JSON
    pub output_path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use figment::Jail;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret as _;

    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::from_figment(Figment::new()).unwrap();

        assert_eq!(settings.pinecone.index_name, "rag-agent");
        assert_eq!(settings.pinecone.dimension, 3072);
        assert_eq!(settings.pinecone.metric, Metric::Dotproduct);
        assert_eq!(
            settings.indexing.sparse_model_path,
            PathBuf::from("data/bm25_values.json")
        );
        assert_eq!(settings.retry_policy(), RetryPolicy::default());
        assert_eq!(settings.transport(), TransportConfig::default());
        assert_eq!(settings.search_strategy().unwrap(), HybridSearch::default());
        assert_eq!(
            settings.openai.transcription_endpoint(),
            "https://api.openai.com/v1/audio/transcriptions"
        );
        assert!(settings.openai_api_key().is_err());
        assert!(settings.evaluation.cases.is_empty());
    }

    #[test]
    fn test_file_and_env_are_merged() {
        Jail::expect_with(|jail| {
            jail.create_file(
                CONFIG_FILE,
                r#"
                [openai]
                api_key = "from-file"
                api_base = "http://localhost:8080/v1/"

                [pinecone]
                metric = "cosine"
                namespace = "docs"

                [retry]
                max_attempts = 5
                deadline_ms = 30000

                [[evaluation.cases]]
                question = "What is chunking?"
                ground_truth = "Splitting documents."

                [[evaluation.cases]]
                question = "What is RAG?"
                "#,
            )?;
            jail.set_env("RAGLINE_OPENAI__API_KEY", "from-env");
            jail.set_env("RAGLINE_RETRIEVAL__TOP_K", "5");
            jail.set_env("RAGLINE_TRANSPORT__VERIFY_TLS", "false");

            let settings = Settings::load().map_err(|e| format!("{e:#}"))?;

            assert_eq!(
                settings.openai_api_key().unwrap().expose_secret(),
                "from-env"
            );
            assert_eq!(
                settings.openai.transcription_endpoint(),
                "http://localhost:8080/v1/audio/transcriptions"
            );
            assert_eq!(settings.pinecone.metric, Metric::Cosine);
            assert_eq!(settings.pinecone.namespace.as_deref(), Some("docs"));
            assert_eq!(settings.retrieval.top_k, 5);
            assert!(!settings.transport().verify_tls);

            let policy = settings.retry_policy();
            assert_eq!(policy.max_attempts, 5);
            assert_eq!(policy.deadline, Some(Duration::from_secs(30)));

            assert_eq!(
                settings.evaluation.cases,
                vec![
                    EvaluationCase::new("What is chunking?", "Splitting documents."),
                    EvaluationCase::new("What is RAG?", ""),
                ]
            );
            Ok(())
        });
    }

    #[test]
    fn test_invalid_alpha() {
        Jail::expect_with(|jail| {
            jail.set_env("RAGLINE_RETRIEVAL__ALPHA", "1.5");

            let settings = Settings::load().map_err(|e| format!("{e:#}"))?;
            assert!(settings.search_strategy().is_err());
            Ok(())
        });
    }

    #[test]
    fn test_wrong_type_is_an_error() {
        Jail::expect_with(|jail| {
            jail.set_env("RAGLINE_RETRIEVAL__TOP_K", "many");

            assert!(Settings::load().is_err());
            Ok(())
        });
    }
}
