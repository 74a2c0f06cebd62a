use std::path::Path;

use ragline_core::FileKind;

use crate::{audio::AudioProcessor, image::ImageProcessor, video::VideoProcessor};

/// Routes a media file to the processor for its [`FileKind`].
#[derive(Debug, Clone)]
pub struct MediaDescriber {
    image: ImageProcessor,
    audio: AudioProcessor,
    video: VideoProcessor,
}

impl MediaDescriber {
    pub fn new(image: ImageProcessor, audio: AudioProcessor, video: VideoProcessor) -> Self {
        Self {
            image,
            audio,
            video,
        }
    }

    /// The report for the file at `path`.
    ///
    /// Missing files and anything that is not video, image or audio produce an `[ERROR]` line
    /// instead of a report.
    pub async fn describe(&self, path: impl AsRef<Path>) -> String {
        let path = path.as_ref();

        if !path.exists() {
            return format!("[ERROR] File not found: {}", path.display());
        }

        let kind = FileKind::from_path(path);
        if !kind.is_media() {
            let name = path
                .file_name()
                .unwrap_or(path.as_os_str())
                .to_string_lossy();
            return format!("[ERROR] Unsupported file format: {name}");
        }

        tracing::info!(%kind, path = %path.display(), "Describing media");

        match kind {
            FileKind::Video => self.video.analyze(path).await,
            FileKind::Image => self.image.analyze(path).await,
            _ => self.audio.analyze(path).await,
        }
    }
}

/// Cleans a path typed or pasted by a user: surrounding whitespace and every quote are removed.
pub fn clean_input_path(input: &str) -> String {
    input.trim().replace(['"', '\''], "")
}
