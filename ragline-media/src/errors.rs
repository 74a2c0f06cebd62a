use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("media file not found: {}", .path.display())]
    NotFound { path: PathBuf },
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid MIME type `{mime_type}`: {source}")]
    InvalidMimeType {
        mime_type: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// Any non 2xx response
    #[error("endpoint returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("response is not valid json: {0}")]
    Decode(#[from] serde_json::Error),
    /// Every attempt under the retry policy failed. Carries the error of the last attempt.
    #[error("{source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<MediaError>,
    },
    #[error("{tool} failed: {message}")]
    Tool { tool: &'static str, message: String },
}

impl MediaError {
    /// Whether another attempt could succeed. Requests that cannot even be built never will.
    pub fn is_transient(&self) -> bool {
        match self {
            MediaError::InvalidMimeType { .. }
            | MediaError::NotFound { .. }
            | MediaError::Read { .. } => false,
            MediaError::Request(error) => !error.is_builder(),
            MediaError::RetriesExhausted { source, .. } => source.is_transient(),
            _ => true,
        }
    }

    /// Attempts made before giving up, if this is a terminal network failure.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            MediaError::RetriesExhausted { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }
}
