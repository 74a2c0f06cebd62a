//! Classification of input files by extension.
//!
//! Determined once at ingestion and matched exhaustively by the loaders and media processors.
use std::path::Path;

/// The kind of an input file. `Unsupported` carries the rejected extension (lowercased, empty
/// when the path has none).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FileKind {
    Pdf,
    Csv,
    Video,
    Image,
    Audio,
    Unsupported(String),
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileKind::Pdf => f.write_str("pdf"),
            FileKind::Csv => f.write_str("csv"),
            FileKind::Video => f.write_str("video"),
            FileKind::Image => f.write_str("image"),
            FileKind::Audio => f.write_str("audio"),
            FileKind::Unsupported(ext) => write!(f, "unsupported ({ext})"),
        }
    }
}

impl FileKind {
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let extension = path
            .as_ref()
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        Self::from_extension(&extension)
    }

    /// Classifies a bare extension, with or without a leading dot.
    pub fn from_extension(extension: &str) -> Self {
        let extension = extension.trim_start_matches('.').to_lowercase();

        match extension.as_str() {
            "pdf" => FileKind::Pdf,
            "csv" => FileKind::Csv,
            "mp4" | "avi" | "mov" => FileKind::Video,
            "jpg" | "jpeg" | "png" | "webp" => FileKind::Image,
            "mp3" | "wav" | "flac" | "m4a" => FileKind::Audio,
            _ => FileKind::Unsupported(extension),
        }
    }

    pub fn is_media(&self) -> bool {
        matches!(self, FileKind::Video | FileKind::Image | FileKind::Audio)
    }

    /// MIME type used when uploading the file to a remote model.
    pub fn mime_type(path: impl AsRef<Path>) -> &'static str {
        let extension = path
            .as_ref()
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "pdf" => "application/pdf",
            "csv" => "text/csv",
            "mp3" => "audio/mpeg",
            "wav" => "audio/wav",
            "flac" => "audio/flac",
            "m4a" => "audio/mp4",
            "jpg" | "jpeg" => "image/jpeg",
            "png" => "image/png",
            "webp" => "image/webp",
            "mp4" => "video/mp4",
            "mov" => "video/quicktime",
            "avi" => "video/x-msvideo",
            _ => "application/octet-stream",
        }
    }
}
