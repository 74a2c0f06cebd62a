//! Media description for ragline: transcripts of audio, descriptions of images and combined
//! reports for videos.
//!
//! Every processor returns a printable report. Failures of the remote models are reported
//! in-band so the remaining parts of a report are still produced.
mod audio;
mod describer;
mod errors;
mod image;
mod transcriber;
pub mod video;

pub use audio::{audio_report, AudioProcessor};
pub use describer::{clean_input_path, MediaDescriber};
pub use errors::MediaError;
pub use image::{ImageProcessor, IMAGE_PROMPT};
pub use transcriber::{
    MediaTranscriber, MediaTranscriberBuilder, DEFAULT_TRANSCRIPTION_MODEL,
    DEFAULT_TRANSCRIPTION_TIMEOUT, TEXT_NOT_FOUND,
};
pub use video::{Ffmpeg, VideoProcessor, VideoTools};
