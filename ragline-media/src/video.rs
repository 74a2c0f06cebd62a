//! Video analysis: a vision description of the middle frame plus a transcript of the audio
//! track.
//!
//! Decoding is delegated to `ffprobe` and `ffmpeg`, which must be on the `PATH` (or configured
//! through [`Ffmpeg::new`]).
use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use ragline_core::{prompt::Prompt, DescribeImage, ImageData};
use tokio::process::Command;

use crate::{errors::MediaError, transcriber::MediaTranscriber};

pub const FRAME_PROMPT: &str = "Provide a detailed and objective description of the scene and \
                                actions occurring in this single video frame.";
pub const NO_VISUAL_DATA: &str = "No visual data.";
pub const NO_AUDIO_TRACK: &str = "[No audio track found in video]";

/// Transcription of a video's audio track may take longer than a short audio file.
pub const VIDEO_TRANSCRIPTION_TIMEOUT: Duration = Duration::from_secs(120);

/// Frame and audio extraction.
#[async_trait]
pub trait VideoTools: Send + Sync {
    /// The frame in the middle of the video as a JPEG, or `None` if the video has no frames.
    async fn middle_frame(&self, video: &Path) -> Result<Option<Vec<u8>>>;

    /// Writes the audio track to `output` as MP3. Returns false if the video has no audio.
    async fn extract_audio(&self, video: &Path, output: &Path) -> Result<bool>;
}

/// [`VideoTools`] backed by the `ffprobe` and `ffmpeg` binaries.
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    ffprobe: PathBuf,
    ffmpeg: PathBuf,
}

impl Default for Ffmpeg {
    fn default() -> Self {
        Self::new("ffprobe", "ffmpeg")
    }
}

impl Ffmpeg {
    pub fn new(ffprobe: impl Into<PathBuf>, ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            ffprobe: ffprobe.into(),
            ffmpeg: ffmpeg.into(),
        }
    }

    async fn run<I, S>(program: &Path, args: I) -> Result<Vec<u8>, MediaError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let tool = if program.ends_with("ffprobe") {
            "ffprobe"
        } else {
            "ffmpeg"
        };

        let output = Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| MediaError::Tool {
                tool,
                message: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(MediaError::Tool {
                tool,
                message: format!(
                    "exit code {:?}: {}",
                    output.status.code(),
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        Ok(output.stdout)
    }

    async fn duration(&self, video: &Path) -> Result<Option<f64>> {
        let stdout = Self::run(
            &self.ffprobe,
            [
                OsStr::new("-v"),
                OsStr::new("error"),
                OsStr::new("-show_entries"),
                OsStr::new("format=duration"),
                OsStr::new("-of"),
                OsStr::new("default=noprint_wrappers=1:nokey=1"),
                video.as_os_str(),
            ],
        )
        .await?;

        Ok(parse_duration(&String::from_utf8_lossy(&stdout)))
    }

    async fn has_audio(&self, video: &Path) -> Result<bool> {
        let stdout = Self::run(
            &self.ffprobe,
            [
                OsStr::new("-v"),
                OsStr::new("error"),
                OsStr::new("-select_streams"),
                OsStr::new("a"),
                OsStr::new("-show_entries"),
                OsStr::new("stream=index"),
                OsStr::new("-of"),
                OsStr::new("csv=p=0"),
                video.as_os_str(),
            ],
        )
        .await?;

        Ok(!String::from_utf8_lossy(&stdout).trim().is_empty())
    }
}

/// Parses the duration in seconds printed by `ffprobe`. Missing, zero or invalid durations are
/// `None`.
pub fn parse_duration(output: &str) -> Option<f64> {
    output
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|seconds| seconds.is_finite() && *seconds > 0.0)
}

#[async_trait]
impl VideoTools for Ffmpeg {
    async fn middle_frame(&self, video: &Path) -> Result<Option<Vec<u8>>> {
        let Some(duration) = self.duration(video).await? else {
            return Ok(None);
        };

        let seek = format!("{:.3}", duration / 2.0);
        let frame = Self::run(
            &self.ffmpeg,
            [
                OsStr::new("-v"),
                OsStr::new("error"),
                OsStr::new("-ss"),
                OsStr::new(&seek),
                OsStr::new("-i"),
                video.as_os_str(),
                OsStr::new("-frames:v"),
                OsStr::new("1"),
                OsStr::new("-f"),
                OsStr::new("image2pipe"),
                OsStr::new("-vcodec"),
                OsStr::new("mjpeg"),
                OsStr::new("-"),
            ],
        )
        .await?;

        Ok(Some(frame).filter(|frame| !frame.is_empty()))
    }

    async fn extract_audio(&self, video: &Path, output: &Path) -> Result<bool> {
        if !self.has_audio(video).await? {
            return Ok(false);
        }

        Self::run(
            &self.ffmpeg,
            [
                OsStr::new("-v"),
                OsStr::new("error"),
                OsStr::new("-y"),
                OsStr::new("-i"),
                video.as_os_str(),
                OsStr::new("-vn"),
                OsStr::new("-acodec"),
                OsStr::new("libmp3lame"),
                OsStr::new("-q:a"),
                OsStr::new("4"),
                output.as_os_str(),
            ],
        )
        .await?;

        Ok(true)
    }
}

/// Describes what is seen and heard in a video.
#[derive(Clone)]
pub struct VideoProcessor {
    describer: Arc<dyn DescribeImage>,
    transcriber: MediaTranscriber,
    tools: Arc<dyn VideoTools>,
    scratch_dir: PathBuf,
}

impl std::fmt::Debug for VideoProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoProcessor")
            .field("transcriber", &self.transcriber)
            .field("scratch_dir", &self.scratch_dir)
            .finish_non_exhaustive()
    }
}

impl VideoProcessor {
    /// Uses `ffmpeg` from the `PATH` and the system temporary directory for extracted audio.
    pub fn new(describer: Arc<dyn DescribeImage>, transcriber: MediaTranscriber) -> Self {
        Self {
            describer,
            transcriber,
            tools: Arc::new(Ffmpeg::default()),
            scratch_dir: std::env::temp_dir(),
        }
    }

    #[must_use]
    pub fn with_tools(mut self, tools: impl VideoTools + 'static) -> Self {
        self.tools = Arc::new(tools);
        self
    }

    /// Directory for the temporary audio extracts.
    #[must_use]
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    /// The combined visual and audio report.
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn analyze(&self, path: impl AsRef<Path>) -> String {
        let path = path.as_ref();

        let visual = self.describe_frame(path).await;
        let audio = self.transcribe_audio(path).await;

        video_report(&visual, &audio)
    }

    async fn describe_frame(&self, path: &Path) -> String {
        let frame = match self.tools.middle_frame(path).await {
            Ok(Some(frame)) => frame,
            Ok(None) => return NO_VISUAL_DATA.to_string(),
            Err(error) => {
                tracing::warn!(error = format!("{error:#}"), "Failed to extract a frame");
                return NO_VISUAL_DATA.to_string();
            }
        };

        let image = ImageData::new("image/jpeg", STANDARD.encode(frame));
        match self
            .describer
            .describe_image(Prompt::from(FRAME_PROMPT), image)
            .await
        {
            Ok(description) => description,
            Err(error) => {
                tracing::warn!(%error, "Visual analysis failed");
                format!("Visual analysis failed: {error}")
            }
        }
    }

    async fn transcribe_audio(&self, path: &Path) -> String {
        let extract = self
            .scratch_dir
            .join(format!("ragline-audio-{}.mp3", uuid::Uuid::new_v4()));

        let transcript = match self.extract_audio(path, &extract).await {
            Ok(true) => {
                self.transcriber
                    .with_timeout(VIDEO_TRANSCRIPTION_TIMEOUT)
                    .transcribe_file(&extract)
                    .await
            }
            Ok(false) => NO_AUDIO_TRACK.to_string(),
            Err(error) => {
                tracing::warn!(error = format!("{error:#}"), "Failed to extract audio");
                NO_AUDIO_TRACK.to_string()
            }
        };

        if extract.exists() {
            if let Err(error) = fs_err::tokio::remove_file(&extract).await {
                tracing::warn!(%error, "Failed to remove audio extract");
            }
        }

        transcript
    }

    async fn extract_audio(&self, path: &Path, output: &Path) -> Result<bool> {
        fs_err::tokio::create_dir_all(&self.scratch_dir).await?;
        self.tools
            .extract_audio(path, output)
            .await
            .context("Audio extraction failed")
    }
}

pub fn video_report(visual: &str, audio: &str) -> String {
    format!(
        "--- VIDEO ANALYSIS REPORT ---\n\
         1. VISUAL OBSERVATIONS:\n{visual}\n\n\
         2. AUDIO TRANSCRIPT:\n{audio}\n\
         -----------------------------"
    )
}
