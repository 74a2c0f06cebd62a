//! Uploads audio to an `OpenAI` compatible transcription endpoint.
use std::{
    path::Path,
    sync::atomic::{AtomicU32, Ordering},
    time::Duration,
};

use derive_builder::Builder;
use ragline_core::{
    retry::{self, RetryPolicy},
    FileKind,
};
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret as _, SecretString};

use crate::errors::MediaError;

pub const DEFAULT_TRANSCRIPTION_MODEL: &str = "whisper-1";
pub const DEFAULT_TRANSCRIPTION_TIMEOUT: Duration = Duration::from_secs(60);

/// Returned by the endpoint when the response has no `text` field.
pub const TEXT_NOT_FOUND: &str = "[Transcription text field not found in response.]";

/// Transcribes audio with one multipart upload per attempt.
///
/// Network failures, timeouts and non 2xx responses are all retried under the
/// [`RetryPolicy`]. [`MediaTranscriber::transcribe`] reports a final failure in-band, so a
/// report that consists of several parts can still be produced; use
/// [`MediaTranscriber::try_transcribe`] to get the error instead.
#[derive(Clone, Builder)]
#[builder(setter(into), build_fn(error = "anyhow::Error"))]
pub struct MediaTranscriber {
    #[builder(default)]
    http_client: reqwest::Client,
    /// Full url of the transcription endpoint, i.e. `https://api.openai.com/v1/audio/transcriptions`
    endpoint: String,
    api_key: SecretString,
    #[builder(default = "DEFAULT_TRANSCRIPTION_MODEL.to_string()")]
    model: String,
    #[builder(default)]
    retry_policy: RetryPolicy,
    /// Timeout of a single attempt
    #[builder(default = "DEFAULT_TRANSCRIPTION_TIMEOUT")]
    timeout: Duration,
}

impl std::fmt::Debug for MediaTranscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaTranscriber")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("retry_policy", &self.retry_policy)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl MediaTranscriber {
    pub fn builder() -> MediaTranscriberBuilder {
        MediaTranscriberBuilder::default()
    }

    /// Same transcriber with a different per attempt timeout.
    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            timeout,
            ..self.clone()
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Transcribes `audio`, returning `[Audio Transcription Failed: <error>]` once every attempt
    /// failed.
    pub async fn transcribe(&self, audio: Vec<u8>, file_name: &str, mime_type: &str) -> String {
        match self.try_transcribe(audio, file_name, mime_type).await {
            Ok(text) => text,
            Err(error) => failure_tag(&error),
        }
    }

    /// Reads and transcribes the file at `path`. The MIME type is derived from the extension.
    pub async fn transcribe_file(&self, path: impl AsRef<Path>) -> String {
        match self.try_transcribe_file(path).await {
            Ok(text) => text,
            Err(MediaError::NotFound { path }) => {
                format!("[Error] Audio file not found: {}", path.display())
            }
            Err(error) => failure_tag(&error),
        }
    }

    /// # Errors
    ///
    /// - [`MediaError::NotFound`] if there is no file at `path`
    /// - [`MediaError::Read`] if it cannot be read
    /// - otherwise as [`MediaTranscriber::try_transcribe`]
    pub async fn try_transcribe_file(&self, path: impl AsRef<Path>) -> Result<String, MediaError> {
        let path = path.as_ref();

        if !path.is_file() {
            return Err(MediaError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let audio = fs_err::tokio::read(path)
            .await
            .map_err(|source| MediaError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let file_name = path
            .file_name()
            .map_or_else(|| "audio".to_string(), |name| name.to_string_lossy().to_string());

        self.try_transcribe(audio, &file_name, FileKind::mime_type(path))
            .await
    }

    /// # Errors
    ///
    /// Returns [`MediaError::RetriesExhausted`] with the error of the last attempt. Errors that
    /// are not [`MediaError::is_transient`] are returned as is after the first attempt.
    #[tracing::instrument(skip(self, audio), fields(bytes = audio.len(), model = %self.model))]
    pub async fn try_transcribe(
        &self,
        audio: Vec<u8>,
        file_name: &str,
        mime_type: &str,
    ) -> Result<String, MediaError> {
        let attempts = AtomicU32::new(0);

        let result = retry::execute_if(
            &self.retry_policy,
            || {
                attempts.fetch_add(1, Ordering::Relaxed);
                self.attempt(audio.clone(), file_name, mime_type)
            },
            MediaError::is_transient,
        )
        .await;

        result.map_err(|error| {
            if error.is_transient() {
                MediaError::RetriesExhausted {
                    attempts: attempts.load(Ordering::Relaxed),
                    source: Box::new(error),
                }
            } else {
                error
            }
        })
    }

    async fn attempt(
        &self,
        audio: Vec<u8>,
        file_name: &str,
        mime_type: &str,
    ) -> Result<String, MediaError> {
        let file = Part::bytes(audio)
            .file_name(file_name.to_string())
            .mime_str(mime_type)
            .map_err(|source| MediaError::InvalidMimeType {
                mime_type: mime_type.to_string(),
                source,
            })?;

        let form = Form::new()
            .part("file", file)
            .text("model", self.model.clone())
            .text("response_format", "json")
            .text("temperature", "0.0");

        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .timeout(self.timeout)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MediaError::Status { status, body });
        }

        let body: serde_json::Value = serde_json::from_slice(&response.bytes().await?)?;

        Ok(body
            .get("text")
            .and_then(serde_json::Value::as_str)
            .map_or_else(|| TEXT_NOT_FOUND.to_string(), ToString::to_string))
    }
}

fn failure_tag(error: &MediaError) -> String {
    tracing::warn!(%error, "Audio transcription failed");
    format!("[Audio Transcription Failed: {error}]")
}
