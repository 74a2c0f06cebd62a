use std::{path::Path, sync::Arc};

use anyhow::{Context as _, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use ragline_core::{prompt::Prompt, DescribeImage, FileKind, ImageData};

pub const IMAGE_PROMPT: &str = "Analyze this image and provide a highly detailed, objective \
                                description. List all visible objects, people, actions, and the \
                                setting/environment. Do not hallucinate details.";

/// Describes a still image with a vision model.
#[derive(Clone)]
pub struct ImageProcessor {
    describer: Arc<dyn DescribeImage>,
}

impl std::fmt::Debug for ImageProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageProcessor").finish_non_exhaustive()
    }
}

impl ImageProcessor {
    /// Wrap `describer` in [`ragline_core::WithRetry`] to retry flaky vision calls.
    pub fn new(describer: Arc<dyn DescribeImage>) -> Self {
        Self { describer }
    }

    /// The description, or `[Image Analysis Failed]: <error>`.
    pub async fn analyze(&self, path: impl AsRef<Path>) -> String {
        match self.try_analyze(path).await {
            Ok(description) => description,
            Err(error) => {
                tracing::warn!(error = format!("{error:#}"), "Image analysis failed");
                format!("[Image Analysis Failed]: {error:#}")
            }
        }
    }

    /// # Errors
    ///
    /// Errors if the file cannot be read or the vision model fails.
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn try_analyze(&self, path: impl AsRef<Path>) -> Result<String> {
        let path = path.as_ref();
        anyhow::ensure!(path.is_file(), "Image file not found: {}", path.display());

        let bytes = fs_err::tokio::read(path).await?;
        let image = ImageData::new(FileKind::mime_type(path), STANDARD.encode(bytes));

        self.describer
            .describe_image(Prompt::from(IMAGE_PROMPT), image)
            .await
            .context("Vision model failed")
    }
}

#[cfg(test)]
mod tests {
    use ragline_core::{LanguageModelError, MockDescribeImage};
    use temp_dir::TempDir;

    use super::*;

    #[tokio::test]
    async fn test_sends_base64_image_with_prompt() {
        let dir = TempDir::new().unwrap();
        let path = dir.child("photo.png");
        std::fs::write(&path, b"hello").unwrap();

        let mut describer = MockDescribeImage::new();
        describer
            .expect_describe_image()
            .withf(|prompt, image| {
                prompt.render().unwrap() == IMAGE_PROMPT
                    && image.mime_type == "image/png"
                    && image.base64 == "aGVsbG8="
            })
            .once()
            .returning(|_, _| Ok("A greeting.".to_string()));

        let description = ImageProcessor::new(Arc::new(describer)).analyze(&path).await;

        assert_eq!(description, "A greeting.");
    }

    #[tokio::test]
    async fn test_failure_is_reported_in_band() {
        let dir = TempDir::new().unwrap();
        let path = dir.child("photo.jpg");
        std::fs::write(&path, b"jpeg").unwrap();

        let mut describer = MockDescribeImage::new();
        describer
            .expect_describe_image()
            .returning(|_, _| Err(LanguageModelError::permanent("model overloaded")));

        let description = ImageProcessor::new(Arc::new(describer)).analyze(&path).await;

        assert!(description.starts_with("[Image Analysis Failed]: Vision model failed"));
        assert!(description.contains("model overloaded"));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let describer = MockDescribeImage::new();

        let description = ImageProcessor::new(Arc::new(describer))
            .analyze("nope.png")
            .await;

        assert_eq!(
            description,
            "[Image Analysis Failed]: Image file not found: nope.png"
        );
    }
}
