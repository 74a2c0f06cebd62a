use std::path::Path;

use crate::transcriber::MediaTranscriber;

/// Transcribes audio files.
#[derive(Debug, Clone)]
pub struct AudioProcessor {
    transcriber: MediaTranscriber,
}

impl AudioProcessor {
    pub fn new(transcriber: MediaTranscriber) -> Self {
        Self { transcriber }
    }

    /// The transcript of the file, framed as a report. Failures are reported inside the frame.
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn analyze(&self, path: impl AsRef<Path>) -> String {
        let transcript = self.transcriber.transcribe_file(path).await;
        audio_report(&transcript)
    }
}

pub fn audio_report(transcript: &str) -> String {
    format!("--- AUDIO TRANSCRIPT ---\n{transcript}\n--------------------------")
}
